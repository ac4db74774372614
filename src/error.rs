use thiserror::Error;

/// Misuse of the construction API. Raised when a descriptor is built, never
/// while casting: bad input is reported through `Cast`, not through this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown primitive kind `{0}`")]
    UnknownPrimitive(String),

    #[error("`{0}` is not defined in this recursive group")]
    UndefinedName(String),

    #[error("`{0}` is defined more than once")]
    DuplicateName(String),

    #[error("reference to `{0}` has no enclosing binder")]
    DanglingReference(String),

    #[error("`{0}` recurses without passing through an array, tuple, record or object")]
    UnguardedRecursion(String),

    #[error("enumeration members must be primitive literals, got {0}")]
    InvalidLiteral(String),

    #[error("unknown morphism `{0}`")]
    UnknownMorphism(String),

    #[error("at JSON path {path} → {message}")]
    Document { path: String, message: String },
}
