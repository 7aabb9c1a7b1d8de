//! Builds a VCF file from the allele matrix of a BrAPI server.
//!
//! The run queries `serverinfo`, reads the call-set ids, optionally indexes
//! `variants` for the fixed columns, and then walks the allele matrix one
//! variant page at a time. Data lines are spooled while the FORMAT catalog
//! grows; the meta lines are written in front of them once it is final.

pub mod app;
pub mod brapi;
pub mod capabilities;
pub mod config;
pub mod domain;
pub mod error;
pub mod matrix;
pub mod output;
pub mod pagination;
pub mod variants;
pub mod vcf;
