//! Service-level tests using mockall doubles and a local mock render host
