//! Help text rendering for subtrees.

use crate::node::NodeId;
use crate::reader::ARGUMENT_SEPARATOR;
use crate::sender::CommandSender;
use crate::tree::CommandTree;

const USAGE_OPTIONAL_OPEN: &str = "[";
const USAGE_OPTIONAL_CLOSE: &str = "]";
const USAGE_REQUIRED_OPEN: &str = "(";
const USAGE_REQUIRED_CLOSE: &str = ")";
const USAGE_OR: &str = "|";

impl CommandTree {
    /// Every executable path below `id`, one usage string each, in child order.
    ///
    /// With `restricted`, subtrees `sender` may not use are left out.
    pub fn all_usage(&self, id: NodeId, sender: &dyn CommandSender, restricted: bool) -> Vec<String> {
        let mut result = Vec::new();
        if self.get(id).is_some() {
            self.collect_usage(id, sender, restricted, String::new(), &mut result);
        }
        result
    }

    fn collect_usage(
        &self,
        id: NodeId,
        sender: &dyn CommandSender,
        restricted: bool,
        prefix: String,
        result: &mut Vec<String>,
    ) {
        let node = self.node(id);
        if restricted && !node.can_use(sender) {
            return;
        }
        if self.is_executable(id) {
            result.push(prefix.clone());
        }
        if let Some(target) = node.redirect {
            let redirect = self.redirect_usage(target);
            if prefix.is_empty() {
                result.push(format!("{}{ARGUMENT_SEPARATOR}{redirect}", node.usage_text()));
            } else {
                result.push(format!("{prefix}{ARGUMENT_SEPARATOR}{redirect}"));
            }
            return;
        }
        for (_, child) in node.children() {
            let usage = self.node(child).usage_text();
            let next = if prefix.is_empty() {
                usage
            } else {
                format!("{prefix}{ARGUMENT_SEPARATOR}{usage}")
            };
            self.collect_usage(child, sender, restricted, next, result);
        }
    }

    /// One condensed usage line per child of `id` that `sender` may use.
    ///
    /// Optional tokens render as `[x]`, required alternatives as `(a|b)`.
    pub fn smart_usage(&self, id: NodeId, sender: &dyn CommandSender) -> Vec<(NodeId, String)> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let optional = node.command.is_some();
        node.children()
            .filter_map(|(_, child)| {
                self.smart_usage_of(child, sender, optional, false)
                    .map(|usage| (child, usage))
            })
            .collect()
    }

    fn smart_usage_of(
        &self,
        id: NodeId,
        sender: &dyn CommandSender,
        optional: bool,
        deep: bool,
    ) -> Option<String> {
        let node = self.node(id);
        if !node.can_use(sender) {
            return None;
        }
        let this = if optional {
            format!("{USAGE_OPTIONAL_OPEN}{}{USAGE_OPTIONAL_CLOSE}", node.usage_text())
        } else {
            node.usage_text()
        };
        if deep {
            return Some(this);
        }
        if let Some(target) = node.redirect {
            return Some(format!("{this}{ARGUMENT_SEPARATOR}{}", self.redirect_usage(target)));
        }

        let child_optional = self.is_executable(id);
        let children: Vec<NodeId> = node
            .children()
            .map(|(_, child)| child)
            .filter(|child| self.node(*child).can_use(sender))
            .collect();

        match children.as_slice() {
            [] => Some(this),
            [only] => match self.smart_usage_of(*only, sender, child_optional, child_optional) {
                Some(usage) => Some(format!("{this}{ARGUMENT_SEPARATOR}{usage}")),
                None => Some(this),
            },
            _ => {
                let mut distinct: Vec<String> = Vec::new();
                for child in &children {
                    if let Some(usage) = self.smart_usage_of(*child, sender, child_optional, true) {
                        if !distinct.contains(&usage) {
                            distinct.push(usage);
                        }
                    }
                }
                match distinct.as_slice() {
                    [] => Some(this),
                    [usage] => Some(format!("{this}{ARGUMENT_SEPARATOR}{usage}")),
                    _ => {
                        let (open, close) = if child_optional {
                            (USAGE_OPTIONAL_OPEN, USAGE_OPTIONAL_CLOSE)
                        } else {
                            (USAGE_REQUIRED_OPEN, USAGE_REQUIRED_CLOSE)
                        };
                        let alternatives: Vec<String> = children
                            .iter()
                            .map(|child| self.node(*child).usage_text())
                            .collect();
                        Some(format!(
                            "{this}{ARGUMENT_SEPARATOR}{open}{}{close}",
                            alternatives.join(USAGE_OR)
                        ))
                    }
                }
            }
        }
    }

    fn redirect_usage(&self, target: NodeId) -> String {
        if target == NodeId::ROOT {
            "...".to_owned()
        } else {
            format!("-> {}", self.node(target).usage_text())
        }
    }
}
