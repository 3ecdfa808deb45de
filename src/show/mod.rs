//! Firing show model and loading.
//!
//! A show is an ordered list of firing steps. Each step names the pins to
//! fire together and the delay to hold before the next step.

mod loader;
mod model;

pub use loader::{load_show, parse_show, ShowLoadError};
pub(crate) use model::format_pins;
pub use model::{FiringStep, Pin, PinError, PlanEntry, Show, ShowPlan, StepError, MAX_PIN};
