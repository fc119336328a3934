use crate::common::ID_LENGTH;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generates a new random primary key made of 16 alphanumeric characters.
pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}
