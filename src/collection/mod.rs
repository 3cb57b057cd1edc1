mod loader;
mod model;

pub use loader::{load_collection, load_environment};
pub use model::{
    Body, Collection, CollectionInfo, Environment, Event, Header, Item, QueryParam, Request,
    Script, Url, VariableEntry,
};

impl Collection {
    /// Folders matched by `breadcrumb`, outermost first. Matching stops at the
    /// first segment with no folder of that name.
    pub fn folder_chain(&self, breadcrumb: &[String]) -> Vec<&Item> {
        let mut chain = Vec::new();
        let mut level: &[Item] = &self.item;
        for segment in breadcrumb {
            let Some(folder) = level
                .iter()
                .find(|item| item.is_folder() && &item.name == segment)
            else {
                break;
            };
            chain.push(folder);
            level = folder.children();
        }
        chain
    }

    /// Finds the request named `name` inside the folder addressed by
    /// `breadcrumb`. Every breadcrumb segment must match.
    pub fn find_request(&self, breadcrumb: &[String], name: &str) -> Option<&Item> {
        let chain = self.folder_chain(breadcrumb);
        if chain.len() != breadcrumb.len() {
            return None;
        }
        let level = chain
            .last()
            .map(|folder| folder.children())
            .unwrap_or(self.item.as_slice());
        level
            .iter()
            .find(|item| !item.is_folder() && item.request.is_some() && item.name == name)
    }

    /// Every request in tree order with its folder breadcrumb.
    pub fn requests(&self) -> Vec<(Vec<String>, &Item)> {
        fn walk<'a>(
            items: &'a [Item],
            path: &mut Vec<String>,
            out: &mut Vec<(Vec<String>, &'a Item)>,
        ) {
            for item in items {
                if item.is_folder() {
                    path.push(item.name.clone());
                    walk(item.children(), path, out);
                    path.pop();
                } else if item.request.is_some() {
                    out.push((path.clone(), item));
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.item, &mut Vec::new(), &mut out);
        out
    }
}
