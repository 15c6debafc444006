use ethers::abi::{Abi, Event, RawLog, Token};
use ethers::types::{Address, Log, H256, U256};
use std::collections::HashMap;

/// One receipt log decoded against the contract interface.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    /// Return values in declaration order.
    pub values: Vec<Token>,
}

impl DecodedEvent {
    pub fn uint(&self, index: usize) -> Option<U256> {
        match self.values.get(index) {
            Some(Token::Uint(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn address(&self, index: usize) -> Option<Address> {
        match self.values.get(index) {
            Some(Token::Address(address)) => Some(*address),
            _ => None,
        }
    }
}

/// Value under one event name. A receipt emitting the same event more than
/// once folds into `Many`, receipt order preserved.
#[derive(Debug, Clone, PartialEq)]
pub enum EventEntry {
    Single(DecodedEvent),
    Many(Vec<DecodedEvent>),
}

/// Every log of one receipt, each entry exactly once: matched logs keyed by
/// event name, the rest kept raw under numeric keys in insertion order.
#[derive(Debug, Default)]
pub struct ReceiptEvents {
    named: HashMap<String, EventEntry>,
    unmatched: Vec<RawLog>,
}

impl ReceiptEvents {
    pub fn get(&self, name: &str) -> Option<&EventEntry> {
        self.named.get(name)
    }

    /// First decoded occurrence of `name`, if any.
    pub fn first(&self, name: &str) -> Option<&DecodedEvent> {
        match self.named.get(name)? {
            EventEntry::Single(event) => Some(event),
            EventEntry::Many(events) => events.first(),
        }
    }

    /// Raw logs that matched no known signature, in receipt order. The index
    /// is the entry's synthetic key.
    pub fn unmatched(&self) -> &[RawLog] {
        &self.unmatched
    }

    /// Log entries accounted for across named and synthetic keys.
    pub fn total_len(&self) -> usize {
        let named: usize = self
            .named
            .values()
            .map(|entry| match entry {
                EventEntry::Single(_) => 1,
                EventEntry::Many(events) => events.len(),
            })
            .sum();
        named + self.unmatched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.unmatched.is_empty()
    }

    fn push_named(&mut self, event: DecodedEvent) {
        match self.named.get_mut(&event.name) {
            None => {
                self.named
                    .insert(event.name.clone(), EventEntry::Single(event));
            }
            Some(entry) => match entry {
                EventEntry::Single(first) => {
                    let first = first.clone();
                    *entry = EventEntry::Many(vec![first, event]);
                }
                EventEntry::Many(events) => events.push(event),
            },
        }
    }
}

/// Decodes every receipt log against the event interface carried in `abi`.
///
/// Matching is by structural signature only: the log's first topic against
/// `Event::signature()`. Logs matching no known signature, or failing to
/// decode against the matched schema, are kept raw under synthetic keys
/// rather than dropped. Pure function of its inputs.
pub fn decode_receipt_logs(abi: &Abi, logs: &[Log]) -> ReceiptEvents {
    let known: HashMap<H256, &Event> = abi
        .events()
        .map(|event| (event.signature(), event))
        .collect();

    let mut out = ReceiptEvents::default();
    for log in logs {
        let raw = RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        };
        let decoded = log
            .topics
            .first()
            .and_then(|topic| known.get(topic))
            .and_then(|event| {
                event.parse_log(raw.clone()).ok().map(|parsed| DecodedEvent {
                    name: event.name.clone(),
                    values: parsed.params.into_iter().map(|param| param.value).collect(),
                })
            });
        match decoded {
            Some(event) => out.push_named(event),
            None => out.unmatched.push(raw),
        }
    }
    out
}
