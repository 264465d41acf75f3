//! Cross-module tests for the retrieval pipeline.
