//! The accumulating bulk payload for the current cycle

use std::mem;

use super::record::BulkItem;

/// Items waiting for the next flush, in arrival order.
#[derive(Debug, Default)]
pub struct Batch {
    items: Vec<BulkItem>,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: BulkItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Empties the batch, returning its items. Capacity is kept for reuse.
    pub fn take(&mut self) -> Vec<BulkItem> {
        let capacity = self.items.capacity();
        mem::replace(&mut self.items, Vec::with_capacity(capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Identifier;
    use serde_json::json;

    fn item(id: u64) -> BulkItem {
        BulkItem {
            id: Identifier::new(id),
            collection: "logs".into(),
            document: json!(id),
        }
    }

    #[test]
    fn test_take_preserves_order_and_empties() {
        let mut batch = Batch::with_capacity(4);
        batch.push(item(3));
        batch.push(item(1));
        batch.push(item(2));

        let taken = batch.take();
        let ids: Vec<u64> = taken.iter().map(|i| i.id.value()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_take_empty() {
        let mut batch = Batch::default();
        assert!(batch.take().is_empty());
        assert_eq!(batch.len(), 0);
    }
}
