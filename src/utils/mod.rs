// Make test utilities available for both unit tests and integration tests
pub mod test_helpers;
