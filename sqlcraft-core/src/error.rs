use std::fmt;

/// A diagnostic breadcrumb attached to terminal errors: the statement that
/// was active, what the runtime was doing, and (when safe to display) the
/// SQL fragment involved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Breadcrumb {
    /// The mapped statement id in play, if any.
    pub statement_id: Option<String>,
    /// A short description of what was happening ("rendering dynamic SQL",
    /// "binding parameter 3", "projecting row 12", ...).
    pub activity: Option<String>,
    /// The SQL fragment involved, when it is safe to display.
    pub sql_fragment: Option<String>,
}

impl Breadcrumb {
    /// Creates an empty breadcrumb.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the statement id.
    pub fn with_statement(mut self, id: impl Into<String>) -> Self {
        self.statement_id = Some(id.into());
        self
    }

    /// Sets the activity description.
    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.activity = Some(activity.into());
        self
    }

    /// Sets the SQL fragment.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql_fragment = Some(sql.into());
        self
    }
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        if let Some(id) = &self.statement_id {
            write!(f, "statement `{}`", id)?;
            wrote = true;
        }
        if let Some(activity) = &self.activity {
            write!(f, "{}{}", if wrote { " while " } else { "while " }, activity)?;
            wrote = true;
        }
        if let Some(sql) = &self.sql_fragment {
            write!(f, "{} (sql: {})", if wrote { "," } else { "sql:" }, sql)?;
        }
        Ok(())
    }
}

/// The error kinds produced across the sqlcraft runtime.
///
/// Variants correspond to the error kinds named in the specification rather
/// than to implementation types: every crate in the workspace produces (or
/// converts into) this enum at its public boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested mapper type is unknown, or the mapper method has no
    /// valid statement for the active database id.
    #[error("binding error: {message}")]
    Binding {
        /// Human-readable detail.
        message: String,
    },

    /// Ill-formed configuration or mapper document.
    #[error("build error: {message} ({breadcrumb})")]
    Build {
        /// Human-readable detail.
        message: String,
        /// Diagnostic context.
        breadcrumb: Breadcrumb,
    },

    /// A forward reference (cache, result map, or statement id) was never
    /// resolved by the end of the build.
    #[error("incomplete reference: {kind} `{id}` was never resolved")]
    IncompleteReference {
        /// What kind of thing was referenced ("result map", "cache-ref", ...).
        kind: &'static str,
        /// The unresolved id.
        id: String,
    },

    /// A required default constructor, getter, or setter was missing, or an
    /// overloaded setter was ambiguous.
    #[error("reflection error: {message}")]
    Reflection {
        /// Human-readable detail.
        message: String,
    },

    /// No type handler could be found for a `(javaType, jdbcType)` pair, or
    /// a conversion failed at bind or read time.
    #[error("type conversion error: {message}")]
    TypeConversion {
        /// Human-readable detail.
        message: String,
    },

    /// The driver reported an error; wrapped with diagnostic context.
    #[error("execution error: {message} ({breadcrumb})")]
    Execution {
        /// Human-readable detail.
        message: String,
        /// Diagnostic context.
        breadcrumb: Breadcrumb,
        /// The underlying driver error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A cache decorator invariant was violated (e.g. a blocking release
    /// without a prior lock).
    #[error("cache error: {message}")]
    Cache {
        /// Human-readable detail.
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::Binding`].
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Build`] with an empty breadcrumb.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
            breadcrumb: Breadcrumb::new(),
        }
    }

    /// Shorthand for [`Error::Build`] with a breadcrumb.
    pub fn build_with(message: impl Into<String>, breadcrumb: Breadcrumb) -> Self {
        Self::Build {
            message: message.into(),
            breadcrumb,
        }
    }

    /// Shorthand for [`Error::IncompleteReference`].
    pub fn incomplete_reference(kind: &'static str, id: impl Into<String>) -> Self {
        Self::IncompleteReference {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for [`Error::Reflection`].
    pub fn reflection(message: impl Into<String>) -> Self {
        Self::Reflection {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::TypeConversion`].
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Execution`] with no source error.
    pub fn execution(message: impl Into<String>, breadcrumb: Breadcrumb) -> Self {
        Self::Execution {
            message: message.into(),
            breadcrumb,
            source: None,
        }
    }

    /// Shorthand for [`Error::Cache`].
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
