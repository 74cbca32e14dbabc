use miette::Diagnostic;
use thiserror::Error;

pub type MResult<T> = miette::Result<T>;
pub type Result<T> = std::result::Result<T, CfgError>;

#[derive(Error, Debug, Diagnostic)]
pub enum CfgError {
    #[error("could not read or write the configuration file {path}")]
    #[diagnostic(help("check that the file exists and is accessible"))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration is not valid JSON: {0}")]
    #[diagnostic(help(
        "layers, globalSettings and macros are expected at the top level; action objects are tagged with \"type\""
    ))]
    Json(#[from] serde_json::Error),

    #[error("layer \"{0}\" does not exist")]
    UnknownLayer(String),

    #[error("layer \"{0}\" already exists")]
    DuplicateLayer(String),

    #[error("macro \"{id}\" would reference itself through {path}")]
    #[diagnostic(help("macros may nest but a macro cannot end up invoking itself"))]
    MacroCycle { id: String, path: String },

    #[error("no {trigger} binding for key {key} on layer \"{layer}\"")]
    MissingBinding {
        layer: String,
        key: String,
        trigger: String,
    },
}
