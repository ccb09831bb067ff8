//! Test doubles for driving turns without a real model.

mod scripted_model;

pub use scripted_model::ScriptedModel;
