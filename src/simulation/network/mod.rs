pub mod flow_cap;
pub mod io;
pub mod link;
pub mod stop_queue;
pub mod storage_cap;

use crate::simulation::id::{Id, IdStore};

/// Static road network. Owned by the run; the scheduling core only reads
/// attributes and topology from it.
#[derive(Debug)]
pub struct Network {
    pub node_ids: IdStore<Node>,
    pub link_ids: IdStore<Link>,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub effective_cell_size: f32,
}

#[derive(Debug)]
pub struct Node {
    pub id: Id<Node>,
    pub x: f32,
    pub y: f32,
    pub in_links: Vec<Id<Link>>,
    pub out_links: Vec<Id<Link>>,
}

#[derive(Debug)]
pub struct Link {
    pub id: Id<Link>,
    pub from: Id<Node>,
    pub to: Id<Node>,
    pub length: f64,
    /// Flow capacity in vehicles per hour.
    pub capacity: f32,
    pub freespeed: f32,
    pub permlanes: f32,
    /// Links serving a transit stop never provide parking supply.
    pub is_transit_stop: bool,
}

impl Network {
    pub fn new() -> Self {
        Network {
            node_ids: IdStore::new(),
            link_ids: IdStore::new(),
            nodes: Vec::new(),
            links: Vec::new(),
            effective_cell_size: 7.5,
        }
    }

    pub fn create_node(&mut self, external: &str, x: f32, y: f32) -> Id<Node> {
        let id = self.node_ids.create_id(external);
        assert_eq!(
            id.internal(),
            self.nodes.len() as u64,
            "Node {external} was already added to the network"
        );
        self.nodes.push(Node {
            id: id.clone(),
            x,
            y,
            in_links: Vec::new(),
            out_links: Vec::new(),
        });
        id
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_link(
        &mut self,
        external: &str,
        from: &Id<Node>,
        to: &Id<Node>,
        length: f64,
        capacity: f32,
        freespeed: f32,
        permlanes: f32,
        is_transit_stop: bool,
    ) -> Id<Link> {
        let id = self.link_ids.create_id(external);
        assert_eq!(
            id.internal(),
            self.links.len() as u64,
            "Link {external} was already added to the network"
        );
        self.links.push(Link {
            id: id.clone(),
            from: from.clone(),
            to: to.clone(),
            length,
            capacity,
            freespeed,
            permlanes,
            is_transit_stop,
        });
        self.nodes[from.internal() as usize].out_links.push(id.clone());
        self.nodes[to.internal() as usize].in_links.push(id.clone());
        id
    }

    pub fn get_link(&self, id: &Id<Link>) -> &Link {
        &self.links[id.internal() as usize]
    }

    pub fn get_node(&self, id: &Id<Node>) -> &Node {
        &self.nodes[id.internal() as usize]
    }

    /// Candidate links a vehicle can continue on after the given link, in the
    /// order the graph provides them.
    pub fn out_links(&self, link: &Id<Link>) -> &[Id<Link>] {
        let to = &self.get_link(link).to;
        &self.get_node(to).out_links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_links_follow_to_node() {
        let mut network = Network::new();
        let n1 = network.create_node("n1", 0., 0.);
        let n2 = network.create_node("n2", 100., 0.);
        let n3 = network.create_node("n3", 200., 0.);
        let a = network.create_link("a", &n1, &n2, 100., 3600., 10., 1., false);
        let b = network.create_link("b", &n2, &n3, 100., 3600., 10., 1., false);
        let c = network.create_link("c", &n2, &n1, 100., 3600., 10., 1., false);

        let out = network.out_links(&a);
        assert_eq!(&[b.clone(), c.clone()], out);
        assert!(network.out_links(&b).is_empty());
        assert_eq!("a", network.get_link(&a).id.external());
    }

    #[test]
    #[should_panic(expected = "already added")]
    fn duplicate_node_is_rejected() {
        let mut network = Network::new();
        network.create_node("n1", 0., 0.);
        network.create_node("n1", 1., 1.);
    }
}
