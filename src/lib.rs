//! # condition-statistics
//!
//! A specialized Rust library for condition-wise statistical analysis of single-cell
//! expression data, built around the replicate × treatment × time-point designs used
//! in host-pathogen response experiments.
//!
//! This crate provides two independent computational cores consumed from analysis
//! notebooks and scripts: descriptive-statistics aggregation of an expression matrix
//! over experimental condition groups, and robust non-linear least-squares fitting of
//! power-law dose/kinetics relationships.
//!
//! ## Core Features
//!
//! - **Condition Statistics Aggregation**: Per-gene count, min, max, mean, sample
//!   variance/standard deviation, and skewness for every condition group
//! - **Robust Power-Law Fitting**: `y = a·x^b + c` via damped least squares with
//!   linear, soft-L1, Huber, Cauchy, and arctan losses, plus R² goodness-of-fit
//! - **Sparse Matrix Support**: Optimized for `CsrMatrix` from nalgebra-sparse
//!
//! ## Quick Start
//!
//! Use the `MatrixConditionStats` trait to aggregate a sparse matrix over the
//! default `replicate`/`treatment`/`time_point` grouping, or call
//! [`regression::fit_power_law`] on paired observations.
//!
//! ## Module Organization
//!
//! - **[`annotations`]**: Per-cell categorical metadata and schema validation
//! - **[`aggregate`]**: Condition-group partitioning and statistics aggregation
//! - **[`regression`]**: Power-law curve fitting and goodness-of-fit scoring
//! - **[`error`]**: The crate's error taxonomy

pub mod aggregate;
pub mod annotations;
pub mod error;
pub mod regression;
