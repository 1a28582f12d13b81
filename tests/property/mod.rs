// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of graph resolution and subnet placement that must hold for
//! every declaration sequence.

mod resolve_order;
mod subnet_placement;
