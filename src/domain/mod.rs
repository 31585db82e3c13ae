// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod path_mapper;
pub mod rewriter;
pub mod task;
