use std::{fs, io::Cursor, path::Path};

use anyhow::{Context, Result};

use super::model::{Collection, Environment, VariableEntry};

pub fn load_collection(path: &Path) -> Result<Collection> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading collection {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing collection {}", path.display()))
}

/// Loads a Postman environment file, or a dotenv file when the name ends in
/// `.env`. Dotenv entries are all enabled and the environment is named after
/// the file stem.
pub fn load_environment(path: &Path) -> Result<Environment> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading environment {}", path.display()))?;

    if is_dotenv(path) {
        let mut values: Vec<VariableEntry> = Vec::new();
        for item in dotenvy::from_read_iter(Cursor::new(contents)) {
            let (key, value) =
                item.with_context(|| format!("parsing env file {}", path.display()))?;
            match values.iter_mut().find(|entry| entry.key == key) {
                Some(existing) => existing.value = value,
                None => values.push(VariableEntry::new(key, value)),
            }
        }
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "env".to_string());
        return Ok(Environment {
            id: None,
            name,
            values,
        });
    }

    serde_json::from_str(&contents)
        .with_context(|| format!("parsing environment {}", path.display()))
}

fn is_dotenv(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    name == ".env" || name.ends_with(".env")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn loads_postman_collection() -> Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("api.postman_collection.json");
        std::fs::write(
            &path,
            r#"{
  "info": {"name": "API", "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"},
  "variable": [{"key": "baseUrl", "value": "http://localhost"}],
  "item": [
    {"name": "Users", "item": [
      {"name": "List", "request": {"method": "GET", "url": "{{baseUrl}}/users"}}
    ]}
  ]
}"#,
        )?;

        let collection = load_collection(&path)?;
        assert_eq!(collection.info.name, "API");
        assert_eq!(collection.variable[0].key, "baseUrl");
        assert!(collection.item[0].is_folder());
        let request = collection.item[0].children()[0].request.as_ref().unwrap();
        assert_eq!(request.url.raw, "{{baseUrl}}/users");
        Ok(())
    }

    #[test]
    fn loads_postman_environment() -> Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("dev.postman_environment.json");
        std::fs::write(
            &path,
            r#"{"id":"e1","name":"Dev","values":[
                {"key":"token","value":"abc","enabled":true,"type":"secret"},
                {"key":"old","value":"x","enabled":false}
            ]}"#,
        )?;

        let environment = load_environment(&path)?;
        assert_eq!(environment.name, "Dev");
        assert_eq!(environment.values.len(), 2);
        assert_eq!(environment.values[0].kind.as_deref(), Some("secret"));
        assert!(!environment.values[1].enabled);
        Ok(())
    }

    #[test]
    fn loads_dotenv_environment() -> Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("staging.env");
        std::fs::write(&path, "API_TOKEN=one\nBASE=http://x\nAPI_TOKEN=two\n")?;

        let environment = load_environment(&path)?;
        assert_eq!(environment.name, "staging");
        assert_eq!(
            environment.values,
            vec![
                VariableEntry::new("API_TOKEN", "two"),
                VariableEntry::new("BASE", "http://x"),
            ]
        );
        Ok(())
    }

    #[test]
    fn reports_missing_files_with_context() {
        let err = load_collection(&PathBuf::from("does-not-exist.json")).unwrap_err();
        assert!(err.to_string().contains("reading collection"));
    }
}
