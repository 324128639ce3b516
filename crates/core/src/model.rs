//! Survival classifier: predictor seam, tree-ensemble artifact, and loader.
//!
//! The artifact is a JSON export of a random forest. Each tree is a flat node
//! array rooted at index 0; a split sends a row left when
//! `row[feature] <= threshold`. Class probabilities are the per-tree leaf
//! distributions averaged across the forest.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::passenger::{FeatureRow, FEATURE_COUNT, FEATURE_ORDER};

/* --------------------------------------------------------------------------
Named constants
-------------------------------------------------------------------------- */

/// Artifact file name, resolved against the install root.
pub const MODEL_FILE_NAME: &str = "titanic_model.json";

/// Class index the model emits for a surviving passenger.
pub const SURVIVED_CLASS: i64 = 1;

const DEFAULT_MODEL_NAME: &str = "RandomForestClassifier";
const DEFAULT_MODEL_VERSION: &str = "1.0";

/// Resolve the artifact path under the given install root.
pub fn default_model_path(install_root: &Path) -> PathBuf {
    install_root.join(MODEL_FILE_NAME)
}

/* --------------------------------------------------------------------------
Labels
-------------------------------------------------------------------------- */

/// Human-readable prediction outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SurvivalLabel {
    #[serde(rename = "Survived")]
    Survived,
    #[serde(rename = "Not Survived")]
    NotSurvived,
}

impl SurvivalLabel {
    /// Map a raw class to its label. Anything other than
    /// [`SURVIVED_CLASS`] is "Not Survived".
    pub fn from_class(class: i64) -> Self {
        if class == SURVIVED_CLASS {
            SurvivalLabel::Survived
        } else {
            SurvivalLabel::NotSurvived
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SurvivalLabel::Survived => "Survived",
            SurvivalLabel::NotSurvived => "Not Survived",
        }
    }
}

/* --------------------------------------------------------------------------
Predictor seam
-------------------------------------------------------------------------- */

/// A loaded classifier. Implementations are immutable after construction and
/// shared across request handlers without locking.
pub trait Predictor: Send + Sync {
    /// Predict one class per row. The output has the same length as `rows`.
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<i64>, CoreError>;
}

/// Process-wide handle to the loaded model.
pub type SharedPredictor = Arc<dyn Predictor>;

/// Run a single passenger row through the predictor and map the result.
pub fn predict_label(predictor: &dyn Predictor, row: FeatureRow) -> Result<SurvivalLabel, CoreError> {
    let classes = predictor.predict(std::slice::from_ref(&row))?;
    let class = classes
        .first()
        .copied()
        .ok_or_else(|| CoreError::Prediction("predictor returned no result".to_string()))?;
    Ok(SurvivalLabel::from_class(class))
}

/* --------------------------------------------------------------------------
Tree ensemble
-------------------------------------------------------------------------- */

/// One node of a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class training sample weights that reached this leaf.
    Leaf { value: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk from the root to a leaf. Only valid on a checked tree.
    fn leaf_for(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[*feature] <= *threshold { *left } else { *right },
                TreeNode::Leaf { value } => return value,
            }
        }
    }

    fn check(&self, tree_idx: usize, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("tree {tree_idx} has no nodes"));
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "tree {tree_idx} node {idx} splits on feature {feature}, \
                             model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("tree {tree_idx} node {idx} has a non-finite threshold"));
                    }
                    // Children must point forward so every walk terminates.
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            return Err(format!(
                                "tree {tree_idx} node {idx} has invalid child index {child}"
                            ));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "tree {tree_idx} leaf {idx} has {} class weights, expected {n_classes}",
                            value.len()
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0)
                        || value.iter().sum::<f64>() <= 0.0
                    {
                        return Err(format!("tree {tree_idx} leaf {idx} has invalid class weights"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_model_version() -> String {
    DEFAULT_MODEL_VERSION.to_string()
}

/// A random-forest classifier decoded from the JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_model_version")]
    pub model_version: String,
    pub n_features: usize,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    /// Structural checks run once at load time. After this passes, tree
    /// walks cannot index out of bounds or loop.
    pub fn check(&self) -> Result<(), String> {
        if self.n_features != FEATURE_COUNT {
            return Err(format!(
                "model expects {} features, service provides {FEATURE_COUNT}",
                self.n_features
            ));
        }
        if !self.feature_names.is_empty() && self.feature_names != FEATURE_ORDER {
            return Err(format!(
                "feature names {:?} do not match column order {:?}",
                self.feature_names, FEATURE_ORDER
            ));
        }
        if self.classes.is_empty() {
            return Err("model declares no classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("model has no trees".to_string());
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.check(idx, self.n_features, self.classes.len())?;
        }
        Ok(())
    }

    /// Averaged class probabilities for one row, indexed like `classes`.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf_for(row);
            let total: f64 = leaf.iter().sum();
            for (p, v) in proba.iter_mut().zip(leaf) {
                *p += v / total;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        proba
    }

    /// Arg-max class; ties go to the lowest class index.
    fn predict_one(&self, row: &[f64]) -> i64 {
        let proba = self.predict_proba(row);
        let mut best = 0;
        for (idx, p) in proba.iter().enumerate().skip(1) {
            if *p > proba[best] {
                best = idx;
            }
        }
        self.classes[best]
    }
}

impl Predictor for ForestModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<i64>, CoreError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(CoreError::Prediction(format!(
                        "row has {} features, model expects {}",
                        row.len(),
                        self.n_features
                    )));
                }
                Ok(self.predict_one(row))
            })
            .collect()
    }
}

/* --------------------------------------------------------------------------
Loader
-------------------------------------------------------------------------- */

/// Load and check the model artifact. Called exactly once at startup.
///
/// A missing or unreadable file is [`CoreError::ModelNotFound`]; a file that
/// does not decode to a well-formed forest is [`CoreError::ModelFormat`].
pub fn load_model(path: &Path) -> Result<ForestModel, CoreError> {
    let bytes = std::fs::read(path).map_err(|e| {
        tracing::error!(
            path = %path.display(),
            error = %e,
            "Model artifact not found; run the model-creation procedure to produce it",
        );
        CoreError::ModelNotFound {
            path: path.to_path_buf(),
        }
    })?;

    let model: ForestModel = serde_json::from_slice(&bytes)
        .map_err(|e| e.to_string())
        .and_then(|model: ForestModel| model.check().map(|()| model))
        .map_err(|reason| {
            tracing::error!(path = %path.display(), %reason, "Model artifact is invalid");
            CoreError::ModelFormat {
                path: path.to_path_buf(),
                reason,
            }
        })?;

    tracing::info!(
        path = %path.display(),
        model_name = %model.model_name,
        model_version = %model.model_version,
        trees = model.trees.len(),
        "Model artifact loaded",
    );
    Ok(model)
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
