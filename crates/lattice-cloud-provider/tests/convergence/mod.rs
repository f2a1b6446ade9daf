//! Convergence tests for the Lattice cloud provider actuators
//!
//! These tests drive the actuators against in-memory providers that keep
//! rules and policies in the provider's raw wire shapes, and tell the story
//! of how a bastion or backup bucket settles into its desired state:
//!
//! - `bastion`: rule sets converge, a second pass is a no-op, deletion only
//!   touches this bastion's rules
//! - `retention`: a bucket walks from no policy to a locked one, expires and
//!   is recreated, and recovers from failures part-way through an action
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test -p lattice-cloud-provider --test convergence
//! ```

mod bastion;
