use crate::logic::TriggerRules;

pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// What happens to events once a digest covering them was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseOutPolicy {
    #[default]
    MarkNotified,
    Delete,
}

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Lines per digest page
    pub chunk_size: usize,
    pub close_out: CloseOutPolicy,
    pub trigger_rules: TriggerRules,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        ForwarderConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            close_out: CloseOutPolicy::default(),
            trigger_rules: TriggerRules::default(),
        }
    }
}
