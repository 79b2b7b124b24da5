// ============================================================
// Layer 3 — Heterogeneous Graph
// ============================================================
// The document graph built upstream from SRL parses and entity
// links. It is plain data: node spans, support labels and
// typed edge lists. The model never mutates it.
//
// Node types      tok, sent, srl, ent, AT, query
// Edge types      (src type, relation name, dst type)
//
// Every relation name is resolved ONCE, here, into a
// RelationKind. The relational layer matches on the kind and
// never looks at the relation string again.
//
// Two construction paths:
//   RawGraph  — serde shape read from JSON, or assembled in code
//   HeteroGraph::try_from(raw) — validates and freezes it

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::GraphError;

// ─── Node types ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeType {
    #[serde(rename = "tok")]
    Tok,
    #[serde(rename = "sent")]
    Sent,
    #[serde(rename = "srl")]
    Srl,
    #[serde(rename = "ent")]
    Ent,
    #[serde(rename = "AT")]
    AnswerType,
    #[serde(rename = "query")]
    Query,
}

impl NodeType {
    /// Node types that own a support classifier, in sampling order.
    pub const CLASSIFIED: [NodeType; 3] = [NodeType::Sent, NodeType::Srl, NodeType::Ent];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Tok        => "tok",
            NodeType::Sent       => "sent",
            NodeType::Srl        => "srl",
            NodeType::Ent        => "ent",
            NodeType::AnswerType => "AT",
            NodeType::Query      => "query",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open token range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end:   usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

// ─── Relation kinds ───────────────────────────────────────────────────────────
/// How the relational layer treats one edge partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `srl2tok`, `ent2tok`: recurrent token update, not attention.
    TokenUpdate,
    /// `srl2srl`: carries no message.
    Suppressed,
    /// `ent2ent_rel`: message conditioned on the relation phrase.
    EntityRelation,
    /// `sent2at`: attention with the answer-type projections.
    AnswerType,
    /// Everything else: plain attention message.
    Attention,
}

impl RelationKind {
    pub fn resolve(relation: &str) -> Self {
        if relation.contains("2tok") {
            return RelationKind::TokenUpdate;
        }
        match relation {
            "srl2srl"     => RelationKind::Suppressed,
            "ent2ent_rel" => RelationKind::EntityRelation,
            "sent2at"     => RelationKind::AnswerType,
            _             => RelationKind::Attention,
        }
    }
}

/// Canonical edge type: (source type, relation name, destination type).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeType {
    pub src:      NodeType,
    pub relation: String,
    pub dst:      NodeType,
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.src, self.relation, self.dst)
    }
}

/// Per-edge data carried only by `ent2ent_rel`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationPhrases {
    /// Token span of the connecting relation phrase.
    pub spans:     Vec<Span>,
    /// Signed polarity, multiplies the phrase embedding.
    pub rel_types: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct EdgeSet {
    etype:   EdgeType,
    kind:    RelationKind,
    src:     Vec<usize>,
    dst:     Vec<usize>,
    phrases: Option<RelationPhrases>,
}

impl EdgeSet {
    pub fn etype(&self) -> &EdgeType { &self.etype }
    pub fn kind(&self) -> RelationKind { self.kind }
    pub fn src(&self) -> &[usize] { &self.src }
    pub fn dst(&self) -> &[usize] { &self.dst }
    pub fn phrases(&self) -> Option<&RelationPhrases> { self.phrases.as_ref() }
    pub fn len(&self) -> usize { self.src.len() }
    pub fn is_empty(&self) -> bool { self.src.is_empty() }
}

#[derive(Debug, Clone)]
pub struct NodeSet {
    spans:  Vec<Span>,
    labels: Option<Vec<u8>>,
}

impl NodeSet {
    pub fn spans(&self) -> &[Span] { &self.spans }
    pub fn labels(&self) -> Option<&[u8]> { self.labels.as_deref() }
    pub fn len(&self) -> usize { self.spans.len() }
    pub fn is_empty(&self) -> bool { self.spans.is_empty() }
}

// ─── HeteroGraph ──────────────────────────────────────────────────────────────
/// A validated, immutable heterogeneous graph over one token sequence.
///
/// Node types with zero instances are simply absent. Edge partitions
/// with zero edges are dropped, so every stored edge set has at least
/// one edge.
#[derive(Debug, Clone)]
pub struct HeteroGraph {
    seq_len: usize,
    nodes:   BTreeMap<NodeType, NodeSet>,
    edges:   Vec<EdgeSet>,
}

impl HeteroGraph {
    pub fn seq_len(&self) -> usize { self.seq_len }

    pub fn num_nodes(&self, node_type: NodeType) -> usize {
        self.nodes.get(&node_type).map_or(0, NodeSet::len)
    }

    pub fn node_set(&self, node_type: NodeType) -> Option<&NodeSet> {
        self.nodes.get(&node_type)
    }

    /// Node types with at least one instance, in a stable order.
    pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_sets(&self) -> impl Iterator<Item = (NodeType, &NodeSet)> + '_ {
        self.nodes.iter().map(|(t, set)| (*t, set))
    }

    pub fn edge_sets(&self) -> &[EdgeSet] { &self.edges }

    /// The token-update partition fed by `src`, i.e. `srl2tok` or `ent2tok`.
    pub fn token_update_from(&self, src: NodeType) -> Option<&EdgeSet> {
        self.edges.iter().find(|e| {
            e.kind == RelationKind::TokenUpdate && e.etype.src == src && e.etype.dst == NodeType::Tok
        })
    }
}

// ─── Serde shape ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNodes {
    pub st_end_idx: Vec<(usize, usize)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdges {
    pub src_type: NodeType,
    pub relation: String,
    pub dst_type: NodeType,
    pub src: Vec<usize>,
    pub dst: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_idx: Option<Vec<(usize, usize)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<Vec<f32>>,
}

/// Unvalidated graph as produced by the upstream pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGraph {
    pub seq_len: usize,
    pub nodes:   BTreeMap<NodeType, RawNodes>,
    #[serde(default)]
    pub edges:   Vec<RawEdges>,
}

impl RawGraph {
    pub fn new(seq_len: usize) -> Self {
        Self { seq_len, nodes: BTreeMap::new(), edges: Vec::new() }
    }

    /// One token node per position, each spanning `[i, i + 1)`.
    pub fn with_token_nodes(self) -> Self {
        let spans = (0..self.seq_len).map(|i| (i, i + 1)).collect();
        self.with_nodes(NodeType::Tok, spans, None)
    }

    pub fn with_nodes(
        mut self,
        node_type: NodeType,
        spans:     Vec<(usize, usize)>,
        labels:    Option<Vec<u8>>,
    ) -> Self {
        self.nodes.insert(node_type, RawNodes { st_end_idx: spans, labels });
        self
    }

    pub fn with_edges(
        mut self,
        src_type: NodeType,
        relation: &str,
        dst_type: NodeType,
        pairs:    &[(usize, usize)],
    ) -> Self {
        self.edges.push(RawEdges {
            src_type,
            relation: relation.to_string(),
            dst_type,
            src: pairs.iter().map(|p| p.0).collect(),
            dst: pairs.iter().map(|p| p.1).collect(),
            span_idx: None,
            rel_type: None,
        });
        self
    }

    /// Adds an `ent2ent_rel`-style partition with relation phrase data.
    pub fn with_relation_edges(
        mut self,
        relation:  &str,
        pairs:     &[(usize, usize)],
        spans:     Vec<(usize, usize)>,
        rel_types: Vec<f32>,
    ) -> Self {
        self.edges.push(RawEdges {
            src_type: NodeType::Ent,
            relation: relation.to_string(),
            dst_type: NodeType::Ent,
            src: pairs.iter().map(|p| p.0).collect(),
            dst: pairs.iter().map(|p| p.1).collect(),
            span_idx: Some(spans),
            rel_type: Some(rel_types),
        });
        self
    }
}

impl TryFrom<RawGraph> for HeteroGraph {
    type Error = GraphError;

    fn try_from(raw: RawGraph) -> Result<Self, Self::Error> {
        let seq_len = raw.seq_len;

        let mut nodes = BTreeMap::new();
        for (node_type, raw_nodes) in raw.nodes {
            if raw_nodes.st_end_idx.is_empty() {
                continue;
            }
            nodes.insert(node_type, validate_nodes(node_type, raw_nodes, seq_len)?);
        }

        let tokens = nodes.get(&NodeType::Tok).map_or(0, NodeSet::len);
        if tokens != seq_len || seq_len == 0 {
            return Err(GraphError::TokenCount { tokens, seq_len });
        }

        let mut edges: Vec<EdgeSet> = Vec::new();
        for raw_edges in raw.edges {
            let etype = EdgeType {
                src:      raw_edges.src_type,
                relation: raw_edges.relation.clone(),
                dst:      raw_edges.dst_type,
            };
            if edges.iter().any(|e| e.etype == etype) {
                return Err(GraphError::DuplicateRelation {
                    relation: etype.relation,
                    src:      etype.src,
                    dst:      etype.dst,
                });
            }
            if let Some(edge_set) = validate_edges(etype, raw_edges, &nodes, seq_len)? {
                edges.push(edge_set);
            }
        }

        Ok(Self { seq_len, nodes, edges })
    }
}

fn validate_nodes(node_type: NodeType, raw: RawNodes, seq_len: usize) -> Result<NodeSet, GraphError> {
    let mut spans = Vec::with_capacity(raw.st_end_idx.len());
    for (index, &(start, end)) in raw.st_end_idx.iter().enumerate() {
        if start >= end {
            return Err(GraphError::EmptySpan { node_type, index, start, end });
        }
        if end > seq_len {
            return Err(GraphError::SpanOutOfBounds {
                owner: format!("{node_type} node {index}"),
                start,
                end,
                seq_len,
            });
        }
        spans.push(Span::new(start, end));
    }

    if let Some(labels) = &raw.labels {
        if labels.len() != spans.len() {
            return Err(GraphError::LabelCount { node_type, labels: labels.len(), nodes: spans.len() });
        }
        if let Some((index, &label)) = labels.iter().enumerate().find(|&(_, &l)| l > 1) {
            return Err(GraphError::InvalidLabel { node_type, index, label });
        }
    }

    Ok(NodeSet { spans, labels: raw.labels })
}

fn validate_edges(
    etype:   EdgeType,
    raw:     RawEdges,
    nodes:   &BTreeMap<NodeType, NodeSet>,
    seq_len: usize,
) -> Result<Option<EdgeSet>, GraphError> {
    if raw.src.len() != raw.dst.len() {
        return Err(GraphError::EdgeLengthMismatch {
            relation: etype.relation,
            src:      raw.src.len(),
            dst:      raw.dst.len(),
        });
    }
    if raw.src.is_empty() {
        tracing::debug!("Dropping empty relation {}", etype);
        return Ok(None);
    }

    for (node_type, endpoints) in [(etype.src, &raw.src), (etype.dst, &raw.dst)] {
        let count = nodes.get(&node_type).map_or(0, NodeSet::len);
        if let Some(&index) = endpoints.iter().find(|&&i| i >= count) {
            return Err(GraphError::EdgeEndpoint { relation: etype.relation, node_type, index, count });
        }
    }

    let kind = RelationKind::resolve(&etype.relation);
    if kind == RelationKind::TokenUpdate && etype.dst != NodeType::Tok {
        return Err(GraphError::TokenRelationTarget { relation: etype.relation, dst: etype.dst });
    }

    let phrases = if kind == RelationKind::EntityRelation {
        let edges = raw.src.len();
        let (spans, rel_types) = match (raw.span_idx, raw.rel_type) {
            (Some(s), Some(r)) if s.len() == edges && r.len() == edges => (s, r),
            _ => return Err(GraphError::MissingRelationFeatures { relation: etype.relation, edges }),
        };
        for &(start, end) in &spans {
            if start >= end || end > seq_len {
                return Err(GraphError::SpanOutOfBounds {
                    owner: format!("relation '{}'", etype.relation),
                    start,
                    end,
                    seq_len,
                });
            }
        }
        Some(RelationPhrases {
            spans: spans.into_iter().map(|(s, e)| Span::new(s, e)).collect(),
            rel_types,
        })
    } else {
        None
    };

    Ok(Some(EdgeSet { etype, kind, src: raw.src, dst: raw.dst, phrases }))
}
