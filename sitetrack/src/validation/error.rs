/// Reasons a settings submission is rejected. The stored record is never changed by a
/// rejected submission.
#[crate::sitetrack_error]
pub enum ValidationError {
    /// `timeout` is missing or not a whole number
    #[error("You entered ({value}) as a timeout value. This is not a valid entry. Please enter whole numbers only!")]
    TimeoutNotNumeric {
        /// The submitted value as the user typed it
        value: String,
    },

    /// The submission names a field the settings record does not have
    #[error("unknown settings field: {field}")]
    UnknownField {
        /// The unrecognized key
        field: String,
    },

    /// A value could not be read as the field's type
    #[error("invalid value for {field}: {message}")]
    InvalidField {
        /// The offending field
        field: String,
        /// What was wrong with it
        message: String,
    },
}
