use std::{cell::RefCell, rc::Rc};

use crate::{collection::VariableEntry, executor::ResponseData};

/// A variable list shared between the caller and a running script.
pub type VariableList = Rc<RefCell<Vec<VariableEntry>>>;

/// Working set of one script invocation.
///
/// The variable lists are shared handles: every `set` made by the script is
/// visible to the caller as soon as it completes, including when the script
/// is later interrupted.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub response: Option<Rc<ResponseData>>,
    pub collection_variables: VariableList,
    pub environment_variables: VariableList,
}

impl ExecutionContext {
    pub fn new(collection: Vec<VariableEntry>, environment: Vec<VariableEntry>) -> Self {
        Self {
            response: None,
            collection_variables: Rc::new(RefCell::new(collection)),
            environment_variables: Rc::new(RefCell::new(environment)),
        }
    }

    pub fn with_response(mut self, response: ResponseData) -> Self {
        self.response = Some(Rc::new(response));
        self
    }

    pub fn collection_entries(&self) -> Vec<VariableEntry> {
        self.collection_variables.borrow().clone()
    }

    pub fn environment_entries(&self) -> Vec<VariableEntry> {
        self.environment_variables.borrow().clone()
    }

    /// Environment value first, then collection value.
    pub fn lookup(&self, key: &str) -> Option<String> {
        get_variable(&self.environment_variables, key)
            .or_else(|| get_variable(&self.collection_variables, key))
    }
}

pub fn get_variable(list: &RefCell<Vec<VariableEntry>>, key: &str) -> Option<String> {
    list.borrow()
        .iter()
        .find(|entry| entry.enabled && entry.key == key)
        .map(|entry| entry.value.clone())
}

/// Updates `key` in place (re-enabling it) or appends a new entry.
pub fn set_variable(list: &RefCell<Vec<VariableEntry>>, key: &str, value: &str) {
    let mut entries = list.borrow_mut();
    match entries.iter_mut().find(|entry| entry.key == key) {
        Some(entry) => {
            entry.value = value.to_string();
            entry.enabled = true;
        }
        None => entries.push(VariableEntry::new(key, value)),
    }
}
