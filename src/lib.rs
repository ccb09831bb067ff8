//! Workspace-level integration tests for parley live under `tests/`.
