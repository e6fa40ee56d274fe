use bcrypt::{hash, verify};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(bcrypt::BcryptError),
    #[error("Password verification failed: {0}")]
    VerificationFailed(bcrypt::BcryptError),
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordManager {
    cost: u32,
}

impl PasswordManager {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash(password, self.cost).map_err(PasswordError::HashingFailed)
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        verify(password, hash).map_err(PasswordError::VerificationFailed)
    }
}

impl Default for PasswordManager {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::PasswordManager;

    // Coût minimal pour garder les tests rapides
    const TEST_COST: u32 = 4;

    #[test]
    fn verify_returns_true_when_password_matches() {
        let manager = PasswordManager::new(TEST_COST);
        let password = "secure_password_@123P";
        let hashed = manager.hash(password).expect("Hashing failed");

        assert!(manager.verify(password, &hashed).expect("Verification failed"));
    }

    #[test]
    fn verify_returns_false_when_password_does_not_match() {
        let manager = PasswordManager::new(TEST_COST);
        let hashed = manager.hash("secure_password_@123P").expect("Hashing failed");

        assert!(!manager.verify("wrong_password_@123", &hashed).expect("Verification failed"));
    }

    #[test]
    fn verify_fails_when_case_differs() {
        let manager = PasswordManager::new(TEST_COST);
        let hash = manager.hash("MyPassword").unwrap();

        let result = manager.verify("mypassword", &hash);

        assert!(result.is_ok());
        assert!(!result.unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let manager = PasswordManager::new(TEST_COST);
        assert!(manager.verify("anything", "not-a-bcrypt-hash").is_err());
    }
}
