// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model backend implementations

pub mod ollama;

pub use ollama::OllamaTransport;
