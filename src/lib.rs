//! Rumbo - Conversational Travel Planning Assistant
//!
//! This crate implements a slot-filling travel planner: a conversation
//! gathers trip parameters turn by turn, confirms them, researches the
//! destination via web search, and generates an itinerary.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
