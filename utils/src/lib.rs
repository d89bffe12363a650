mod logging;
mod stack;
mod time;

pub use logging::setup_logging;
pub use stack::{
    region_from_arn, resource_console_link, stack_console_link, stack_name_from_id,
    template_designer_link,
};
pub use time::{epoch_to_timestamp, get_epoch, iso_to_epoch_millis};
