mod client;
mod extract;
mod html;
mod merge;
mod orchestrate;
mod parcel;
mod search;
mod text;
mod types;

#[cfg(test)]
mod tests;

pub use client::TabanowClient;
pub use extract::PlanPageParser;
pub use merge::merge_plan_lists;
pub use parcel::plan_contains_parcel;
pub use types::TabanowConfig;
