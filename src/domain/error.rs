use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The request command does not contain exactly one `/`.
    #[error("command `{command}` is not of the form resource/filename")]
    MalformedCommand { command: String },
}

impl DomainError {
    pub fn malformed_command(command: impl Into<String>) -> Self {
        Self::MalformedCommand {
            command: command.into(),
        }
    }
}
