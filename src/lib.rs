// Copyright 2021 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Bindwm manages the zones of a BIND name server from a catalog of
//! domains.
//!
//! The catalog ([`store::Catalog`]) is the source of truth. Every change
//! made through the [`engine::Engine`] renders a complete zone file
//! ([`zone_file`]), tells the name server to load it through its
//! control channel ([`control`]), and is committed to the catalog only
//! once the name server has accepted it.

pub mod control;
pub mod domain;
pub mod engine;
pub mod name;
pub mod rr;
pub mod store;
pub mod zone_file;
mod util;
