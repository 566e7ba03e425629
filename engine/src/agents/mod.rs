//! Capability Agents
//!
//! The seven providers behind the orchestration core. Each one implements the
//! single-method `CapabilityAgent` contract from the sdk; the driver depends
//! on nothing else about them. Intent and recipe talk to a chat model,
//! inventory and OCR talk to the kitchen backend, and planner, validator, and
//! responder are pure.

pub mod intent;
pub mod inventory;
pub mod ocr;
pub mod planner;
pub mod recipe;
pub mod responder;
pub mod validator;

pub use intent::IntentAgent;
pub use inventory::InventoryAgent;
pub use ocr::OcrAgent;
pub use planner::PlannerAgent;
pub use recipe::RecipeAgent;
pub use responder::ResponderAgent;
pub use validator::ValidatorAgent;
