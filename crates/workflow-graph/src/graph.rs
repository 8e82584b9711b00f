//! The semantic workflow graph
//!
//! `WorkflowGraph` is the source of truth for operators and links. It
//! enforces the structural invariants (unique IDs, no dangling link
//! endpoints, cascade deletion) and publishes a [`GraphEvent`] for every
//! change. Mutators are crate-private: outside code reads the graph and
//! mutates it through [`crate::facade::GraphActionFacade`].

use std::collections::{BTreeSet, HashMap};

use crate::error::{GraphError, Result};
use crate::events::{EventChannel, EventStream, GraphEvent};
use crate::types::{Link, LinkEndpoint, LinkId, Operator, OperatorId, PropertyBag};

/// Operators and links of one workflow
#[derive(Default)]
pub struct WorkflowGraph {
    operators: HashMap<OperatorId, Operator>,
    links: HashMap<LinkId, Link>,
    events: EventChannel<GraphEvent>,
}

impl WorkflowGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every graph change from now on
    pub fn subscribe(&self) -> EventStream<GraphEvent, GraphEvent> {
        self.events.subscribe()
    }

    /// Subscribe to one kind of graph change
    pub fn subscribe_filtered<T>(&self, select: fn(GraphEvent) -> Option<T>) -> EventStream<GraphEvent, T> {
        self.events.subscribe_filtered(select)
    }

    // ---- reads ----

    pub fn operator(&self, operator_id: &str) -> Result<&Operator> {
        self.operators
            .get(operator_id)
            .ok_or_else(|| GraphError::OperatorNotFound(operator_id.to_string()))
    }

    pub fn link(&self, link_id: &str) -> Result<&Link> {
        self.links
            .get(link_id)
            .ok_or_else(|| GraphError::LinkNotFound(link_id.to_string()))
    }

    pub fn has_operator(&self, operator_id: &str) -> bool {
        self.operators.contains_key(operator_id)
    }

    pub fn has_link(&self, link_id: &str) -> bool {
        self.links.contains_key(link_id)
    }

    pub fn operators(&self) -> impl Iterator<Item = &Operator> {
        self.operators.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links whose target is the operator
    pub fn incoming_links<'a>(&'a self, operator_id: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.values().filter(move |l| l.target.operator_id == operator_id)
    }

    /// Links whose source is the operator
    pub fn outgoing_links<'a>(&'a self, operator_id: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.values().filter(move |l| l.source.operator_id == operator_id)
    }

    /// IDs of operators sharing a link with the operator, sorted
    pub fn connected_operators(&self, operator_id: &str) -> Result<Vec<OperatorId>> {
        self.operator(operator_id)?;
        let connected: BTreeSet<OperatorId> = self
            .links
            .values()
            .filter_map(|l| {
                if l.source.operator_id == operator_id {
                    Some(l.target.operator_id.clone())
                } else if l.target.operator_id == operator_id {
                    Some(l.source.operator_id.clone())
                } else {
                    None
                }
            })
            .collect();
        Ok(connected.into_iter().collect())
    }

    /// The link connecting exactly these endpoints, if any
    pub fn link_between(&self, source: &LinkEndpoint, target: &LinkEndpoint) -> Option<&Link> {
        self.links
            .values()
            .find(|l| &l.source == source && &l.target == target)
    }

    // ---- crate-private mutators ----

    pub(crate) fn check_add_operator(&self, operator: &Operator) -> Result<()> {
        if self.has_operator(&operator.operator_id) {
            return Err(GraphError::DuplicateOperator(operator.operator_id.clone()));
        }
        Ok(())
    }

    pub(crate) fn add_operator(&mut self, operator: Operator) -> Result<()> {
        self.check_add_operator(&operator)?;
        log::debug!("Adding operator {} ({})", operator.operator_id, operator.operator_type);
        self.operators
            .insert(operator.operator_id.clone(), operator.clone());
        self.events.emit(GraphEvent::OperatorAdded { operator });
        Ok(())
    }

    /// Remove an operator and every link touching it
    ///
    /// Emits one `LinkDeleted` per incident link, then `OperatorDeleted`.
    pub(crate) fn delete_operator(&mut self, operator_id: &str) -> Result<Operator> {
        self.operator(operator_id)?;

        let mut incident: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| l.touches(operator_id))
            .map(|l| l.link_id.clone())
            .collect();
        incident.sort();
        for link_id in incident {
            self.delete_link(&link_id)?;
        }

        let operator = self
            .operators
            .remove(operator_id)
            .ok_or_else(|| GraphError::OperatorNotFound(operator_id.to_string()))?;
        log::debug!("Deleted operator {}", operator_id);
        self.events.emit(GraphEvent::OperatorDeleted {
            operator: operator.clone(),
        });
        Ok(operator)
    }

    pub(crate) fn check_add_link(&self, link: &Link) -> Result<()> {
        if self.has_link(&link.link_id) {
            return Err(GraphError::DuplicateLink(link.link_id.clone()));
        }

        let source = self.operator(&link.source.operator_id)?;
        if !source.has_output_port(&link.source.port_id) {
            return Err(GraphError::PortNotFound {
                operator_id: source.operator_id.clone(),
                port_id: link.source.port_id.clone(),
                direction: "output",
            });
        }

        let target = self.operator(&link.target.operator_id)?;
        if !target.has_input_port(&link.target.port_id) {
            return Err(GraphError::PortNotFound {
                operator_id: target.operator_id.clone(),
                port_id: link.target.port_id.clone(),
                direction: "input",
            });
        }

        if self.links.values().any(|l| l.same_connection(link)) {
            return Err(GraphError::DuplicateConnection {
                source_id: link.source.operator_id.clone(),
                source_port: link.source.port_id.clone(),
                target_id: link.target.operator_id.clone(),
                target_port: link.target.port_id.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn add_link(&mut self, link: Link) -> Result<()> {
        self.check_add_link(&link)?;
        log::debug!(
            "Adding link {} ({} -> {})",
            link.link_id,
            link.source.operator_id,
            link.target.operator_id
        );
        self.links.insert(link.link_id.clone(), link.clone());
        self.events.emit(GraphEvent::LinkAdded { link });
        Ok(())
    }

    pub(crate) fn delete_link(&mut self, link_id: &str) -> Result<Link> {
        let link = self
            .links
            .remove(link_id)
            .ok_or_else(|| GraphError::LinkNotFound(link_id.to_string()))?;
        log::debug!("Deleted link {}", link_id);
        self.events.emit(GraphEvent::LinkDeleted { link: link.clone() });
        Ok(link)
    }

    /// Replace an operator's property bag
    ///
    /// Returns `false`, emitting nothing, when the new bag equals the old one.
    pub(crate) fn set_operator_property(
        &mut self,
        operator_id: &str,
        properties: PropertyBag,
    ) -> Result<bool> {
        let old_operator = self.operator(operator_id)?;
        if old_operator.properties == properties {
            return Ok(false);
        }

        let old_operator = old_operator.clone();
        let new_operator = old_operator.clone().with_properties(properties);
        self.operators
            .insert(operator_id.to_string(), new_operator.clone());
        self.events.emit(GraphEvent::PropertyChanged {
            old_operator,
            new_operator,
        });
        Ok(true)
    }

    /// Show or hide an operator's advanced options
    pub(crate) fn set_operator_advanced(&mut self, operator_id: &str, show_advanced: bool) -> Result<bool> {
        let operator = self.operator(operator_id)?;
        if operator.show_advanced == show_advanced {
            return Ok(false);
        }

        let mut updated = operator.clone();
        updated.show_advanced = show_advanced;
        self.operators.insert(operator_id.to_string(), updated);
        self.events.emit(GraphEvent::AdvancedToggled {
            operator_id: operator_id.to_string(),
            show_advanced,
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures::{scan, sentiment, view_results};
    use serde_json::json;

    fn link(id: &str, source: &str, target: &str) -> Link {
        Link::new(
            id,
            LinkEndpoint::new(source, "output-0"),
            LinkEndpoint::new(target, "input-0"),
        )
    }

    fn props(value: serde_json::Value) -> PropertyBag {
        value.as_object().unwrap().clone()
    }

    /// scan -> sentiment -> result
    fn three_operator_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        graph.add_operator(scan("scan")).unwrap();
        graph.add_operator(sentiment("sentiment")).unwrap();
        graph.add_operator(view_results("result")).unwrap();
        graph.add_link(link("l1", "scan", "sentiment")).unwrap();
        graph.add_link(link("l2", "sentiment", "result")).unwrap();
        graph
    }

    #[test]
    fn test_add_and_get_operator() {
        let mut graph = WorkflowGraph::new();
        let mut events = graph.subscribe();

        let op = scan("scan").with_properties(props(json!({"tableName": "twitter_sample"})));
        graph.add_operator(op.clone()).unwrap();

        assert_eq!(graph.operator("scan").unwrap(), &op);
        assert_eq!(events.drain(), vec![GraphEvent::OperatorAdded { operator: op }]);
    }

    #[test]
    fn test_add_duplicate_operator_fails() {
        let mut graph = WorkflowGraph::new();
        graph.add_operator(scan("scan")).unwrap();
        let mut events = graph.subscribe();

        let err = graph.add_operator(scan("scan")).unwrap_err();
        assert_eq!(err, GraphError::DuplicateOperator("scan".into()));
        assert!(events.drain().is_empty());
    }

    #[test]
    fn test_get_missing_operator() {
        let graph = WorkflowGraph::new();
        assert!(graph.operator("nope").unwrap_err().is_not_found());
        assert!(graph.link("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_operator_cascades_links_first() {
        let mut graph = three_operator_graph();
        let mut events = graph.subscribe();

        graph.delete_operator("sentiment").unwrap();

        let emitted = events.drain();
        assert_eq!(emitted.len(), 3);
        assert!(matches!(&emitted[0], GraphEvent::LinkDeleted { link } if link.link_id == "l1"));
        assert!(matches!(&emitted[1], GraphEvent::LinkDeleted { link } if link.link_id == "l2"));
        assert!(
            matches!(&emitted[2], GraphEvent::OperatorDeleted { operator } if operator.operator_id == "sentiment")
        );

        assert_eq!(graph.link_count(), 0);
        assert!(graph.links().all(|l| !l.touches("sentiment")));
        assert_eq!(graph.operator_count(), 2);
    }

    #[test]
    fn test_delete_missing_operator_fails() {
        let mut graph = three_operator_graph();
        assert!(graph.delete_operator("nope").is_err());
        assert_eq!(graph.link_count(), 2);
    }

    #[test]
    fn test_add_link_requires_endpoints() {
        let mut graph = WorkflowGraph::new();
        graph.add_operator(scan("scan")).unwrap();

        let err = graph.add_link(link("l1", "scan", "missing")).unwrap_err();
        assert_eq!(err, GraphError::OperatorNotFound("missing".into()));
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn test_add_link_requires_declared_ports() {
        let mut graph = WorkflowGraph::new();
        graph.add_operator(scan("scan")).unwrap();
        graph.add_operator(view_results("result")).unwrap();

        let bad = Link::new(
            "l1",
            LinkEndpoint::new("scan", "output-0"),
            LinkEndpoint::new("result", "input-7"),
        );
        assert!(matches!(
            graph.add_link(bad),
            Err(GraphError::PortNotFound { direction: "input", .. })
        ));
    }

    #[test]
    fn test_add_identical_link_fails() {
        let mut graph = WorkflowGraph::new();
        graph.add_operator(scan("scan")).unwrap();
        graph.add_operator(view_results("result")).unwrap();
        graph.add_link(link("l1", "scan", "result")).unwrap();

        assert!(matches!(
            graph.add_link(link("l2", "scan", "result")),
            Err(GraphError::DuplicateConnection { .. })
        ));
        assert_eq!(
            graph.add_link(link("l1", "scan", "result")).unwrap_err(),
            GraphError::DuplicateLink("l1".into())
        );
    }

    #[test]
    fn test_delete_link() {
        let mut graph = three_operator_graph();
        let removed = graph.delete_link("l1").unwrap();
        assert_eq!(removed.source.operator_id, "scan");
        assert!(!graph.has_link("l1"));
        assert!(graph.delete_link("l1").is_err());
    }

    #[test]
    fn test_set_property_emits_old_and_new() {
        let mut graph = three_operator_graph();
        let before = graph.operator("scan").unwrap().clone();
        let mut changes = graph.subscribe_filtered(GraphEvent::property_change);

        let changed = graph
            .set_operator_property("scan", props(json!({"tableName": "twitter_sample"})))
            .unwrap();
        assert!(changed);

        let (old, new) = changes.try_next().unwrap();
        assert_eq!(old, before);
        assert_eq!(new.properties["tableName"], "twitter_sample");
        // The value taken before the edit is untouched
        assert!(before.properties.is_empty());
    }

    #[test]
    fn test_set_equal_property_is_suppressed() {
        let mut graph = three_operator_graph();
        let mut changes = graph.subscribe_filtered(GraphEvent::property_change);

        graph
            .set_operator_property("scan", props(json!({"tableName": "t"})))
            .unwrap();
        let changed = graph
            .set_operator_property("scan", props(json!({"tableName": "t"})))
            .unwrap();

        assert!(!changed);
        assert_eq!(changes.drain().len(), 1);
    }

    #[test]
    fn test_set_property_missing_operator() {
        let mut graph = WorkflowGraph::new();
        assert!(graph.set_operator_property("nope", PropertyBag::new()).is_err());
    }

    #[test]
    fn test_connected_operators() {
        let graph = three_operator_graph();
        assert_eq!(graph.connected_operators("sentiment").unwrap(), vec!["result", "scan"]);
        assert_eq!(graph.connected_operators("scan").unwrap(), vec!["sentiment"]);
        assert!(graph.connected_operators("nope").is_err());

        assert_eq!(graph.incoming_links("sentiment").count(), 1);
        assert_eq!(graph.outgoing_links("sentiment").count(), 1);
    }

    #[test]
    fn test_link_between() {
        let graph = three_operator_graph();
        let scan_out = LinkEndpoint::new("scan", "output-0");

        let found = graph
            .link_between(&scan_out, &LinkEndpoint::new("sentiment", "input-0"))
            .unwrap();
        assert_eq!(found.link_id, "l1");

        // Direction matters
        assert!(graph
            .link_between(&LinkEndpoint::new("sentiment", "input-0"), &scan_out)
            .is_none());
        assert!(graph
            .link_between(&scan_out, &LinkEndpoint::new("result", "input-0"))
            .is_none());
    }

    #[test]
    fn test_toggle_advanced() {
        let mut graph = three_operator_graph();
        assert!(graph.set_operator_advanced("scan", true).unwrap());
        assert!(!graph.set_operator_advanced("scan", true).unwrap());
        assert!(graph.operator("scan").unwrap().show_advanced);
    }
}
