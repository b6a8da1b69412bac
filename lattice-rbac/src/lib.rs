//! # Lattice RBAC (Role-Based Access Control)
//!
//! This crate provides statement-driven access control for the Lattice
//! platform. Unlike a fixed permission catalogue, the set of resources and
//! actions is declared by the embedding application at startup and roles are
//! defined as subsets of that schema.
//!
//! ## Overview
//!
//! The lattice-rbac crate handles:
//! - **Statements**: the schema declaring which actions exist per resource
//! - **Roles**: named, immutable, mergeable sets of resource→action grants
//! - **Access control**: union-across-roles permission evaluation
//!
//! ## Architecture
//!
//! ```text
//! Statements = { resource -> [allowed actions] }       (closed, per config)
//! Role       = { resource -> [granted actions] }       (subset of Statements)
//! AccessControl = Statements + named Roles
//!
//! check(roles, request) passes iff every requested action on every
//! requested resource is granted by the UNION of the member's roles.
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use lattice_rbac::{AccessControl, AccessRequest, Role, Statements};
//!
//! let statements = Statements::define([
//!     ("project", vec!["create", "update", "delete"]),
//! ]).unwrap();
//!
//! let mut ac = AccessControl::new(statements);
//! ac.define_role("member", [("project", vec!["create"])]).unwrap();
//!
//! let request = AccessRequest::new().resource("project", ["create"]);
//! assert!(ac.check(["member"], &request).is_ok());
//!
//! let request = AccessRequest::new().resource("project", ["delete"]);
//! assert!(ac.check(["member"], &request).is_err());
//! ```
//!
//! ## Evaluation rules
//!
//! - Multiple roles combine by **union**, never intersection.
//! - Resource and action names are matched exactly; there is no wildcard or
//!   hierarchical matching, so checks are O(resources requested).
//! - Requests naming an undeclared resource or action fail closed with an
//!   error distinguishing "unknown permission" from "denied".
//! - Unknown role names fail the check rather than being silently granted.
//!
//! ## Integration with lattice-org
//!
//! `lattice-org` ships default organization statements (organization, member,
//! invitation, team) and the built-in owner/admin/member roles, and merges
//! embedder-defined statements and roles on top of them.

pub mod permissions;
pub mod roles;
pub mod statements;

// Re-export main types for convenience
pub use permissions::{AccessControl, AccessError, AccessRequest};
pub use roles::Role;
pub use statements::{SchemaError, Statements};
