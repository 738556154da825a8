use std::fmt::{Debug, Display, Error as FmtError, Formatter};

/// Names of classes and interfaces, written as `my/pkg/Klass`
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.1>
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct BinaryName(String);

impl BinaryName {
    /// Check if a string would be a valid unqualified name (one `/`-separated segment)
    fn check_valid_segment(name: &str) -> Result<(), String> {
        if name.contains(&['.', ';', '[', '/'][..]) {
            Err(format!(
                "Unqualified name '{}' contains an illegal character",
                name
            ))
        } else if name.is_empty() {
            Err(format!("Unqualified name '{}' is empty", name))
        } else {
            Ok(())
        }
    }

    /// Check if a string would be a valid binary name
    pub fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            Err(format!("Binary name '{}' is empty", name))
        } else {
            name.split('/').map(Self::check_valid_segment).collect()
        }
    }

    /// Try to construct a name from a string
    pub fn from_string(name: String) -> Result<Self, String> {
        match Self::check_valid(&name) {
            Ok(()) => Ok(BinaryName(name)),
            Err(msg) => Err(msg),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment of the name (the name of the class without its package)
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

/// Extracts the raw underlying string name
impl AsRef<str> for BinaryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Debug for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(&self.0)
    }
}

impl Display for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(BinaryName::from_string(String::from("Program")).is_ok());
        let name = BinaryName::from_string(String::from("me/alec/Hello")).unwrap();
        assert_eq!(name.simple_name(), "Hello");
    }

    #[test]
    fn invalid_names() {
        assert!(BinaryName::from_string(String::new()).is_err());
        assert!(BinaryName::from_string(String::from("me.alec.Hello")).is_err());
        assert!(BinaryName::from_string(String::from("me//Hello")).is_err());
        assert!(BinaryName::from_string(String::from("Hello;")).is_err());
    }
}
