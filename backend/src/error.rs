use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("{field}: libellé inconnu '{label}'")]
    UnknownLabel { field: &'static str, label: String },

    #[error("âge hors limites: {0} (attendu entre 18 et 98)")]
    AgeOutOfRange(i64),

    #[error("liste de soumissions vide")]
    EmptyBatch,

    #[error("impossible de charger le modèle {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("format de modèle non supporté: {0}")]
    UnsupportedModelFormat(PathBuf),

    #[error("schéma du modèle incompatible: attendu {expected:?}, trouvé {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("erreur d'inférence: {0}")]
    Inference(#[from] anyhow::Error),

    #[error("sortie du modèle invalide: {0}")]
    MalformedOutput(String),
}

impl PredictorError {
    /// True for failures caused by the submitted form rather than the model.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownLabel { .. } | Self::AgeOutOfRange(_) | Self::EmptyBatch
        )
    }
}

pub type PredictorResult<T> = std::result::Result<T, PredictorError>;
