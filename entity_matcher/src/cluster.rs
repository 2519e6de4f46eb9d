//! Greedy online grouping of labeled items by entity.

use serde::Serialize;
use tracing::debug;

use crate::errors::RulesError;
use crate::label::LabelParser;
use crate::normalize::normalize;
use crate::rules::MatchRules;
use crate::similarity::similarity_with;

/// Items believed to belong to the same real-world entity.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EntityCluster<T> {
    /// Canonical name of the first item that opened the cluster.
    pub key: String,
    /// Longest cleaned label among the members.
    pub display_name: String,
    /// Members in input order.
    pub members: Vec<T>,
}

/// Groups labels into entity clusters.
///
/// Each label is compared with the existing cluster keys in creation order and
/// joins the FIRST one whose similarity exceeds the threshold, not the best one.
/// The outcome therefore depends on input order.
pub struct EntityClusterer<'a> {
    rules: &'a MatchRules,
    parser: LabelParser,
}

impl<'a> EntityClusterer<'a> {
    pub fn new(rules: &'a MatchRules) -> Result<Self, RulesError> {
        Ok(Self {
            rules,
            parser: LabelParser::new(&rules.label)?,
        })
    }

    pub fn parser(&self) -> &LabelParser {
        &self.parser
    }

    /// Canonical entity name of a label: parsed entity fragment, normalized.
    pub fn canonical_name(&self, label: &str) -> String {
        normalize(&self.parser.parse(label).entity, self.rules)
    }

    /// Group items by the entity named in their label.
    ///
    /// Clusters come back in the order their keys were created. Two clusters
    /// may end up with the same display name; both are kept.
    pub fn group<T: AsRef<str>>(&self, items: impl IntoIterator<Item = T>) -> Vec<EntityCluster<T>> {
        let mut groups: Vec<(String, Vec<T>)> = Vec::new();

        for item in items {
            let canonical = self.canonical_name(item.as_ref());

            let existing = groups.iter().position(|(key, _)| {
                similarity_with(&canonical, key, self.rules.containment_similarity)
                    > self.rules.cluster_threshold
            });

            match existing {
                Some(idx) => {
                    debug!(
                        label = item.as_ref(),
                        normalized = %canonical,
                        cluster = %groups[idx].0,
                        "grouped with existing entity"
                    );
                    groups[idx].1.push(item);
                }
                None => {
                    debug!(label = item.as_ref(), normalized = %canonical, "new entity group");
                    groups.push((canonical, vec![item]));
                }
            }
        }

        groups
            .into_iter()
            .map(|(key, members)| {
                let display_name = self.parser.most_complete_name(&members);
                debug!(display_name = %display_name, members = members.len(), "final entity group");
                EntityCluster {
                    key,
                    display_name,
                    members,
                }
            })
            .collect()
    }
}
