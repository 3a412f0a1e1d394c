//! End-to-end tests: signing real artifacts with the GnuPG-generated fixture
//! keys and checking the results with the verifier in `common`.

mod failure_test;
mod sign_flow_test;
