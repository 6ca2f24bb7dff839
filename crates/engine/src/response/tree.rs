use std::sync::Arc;

use serde_json::Value;

use crate::execution::BufferPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ResultMapId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ResultListId(u32);

/// A single writable location of the result tree: a field of a map or an item of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ResultSlot {
    Field { map: ResultMapId, index: u32 },
    Item { list: ResultListId, index: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResultContainer {
    Map(ResultMapId),
    List(ResultListId),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) enum ResultValue {
    /// Not written yet. Remains so if the task owning the slot was cancelled.
    #[default]
    Pending,
    Null,
    Leaf(Value),
    Map(ResultMapId),
    List(ResultListId),
}

#[derive(Debug)]
pub(crate) struct ResultField {
    pub key: Arc<str>,
    pub value: ResultValue,
    pub nullable: bool,
}

#[derive(Debug)]
struct ResultMap {
    // Back-reference used only for null propagation.
    parent: Option<ResultSlot>,
    fields: Vec<ResultField>,
    nulled: bool,
}

#[derive(Debug)]
struct ResultList {
    parent: Option<ResultSlot>,
    items: Vec<ResultValue>,
    items_nullable: bool,
    nulled: bool,
}

/// Output of one execution. Nodes are owned top-down by the tree and refer to their parent by
/// slot, never by ownership.
pub(crate) struct ResultTree {
    maps: Vec<ResultMap>,
    lists: Vec<ResultList>,
    root: Option<ResultContainer>,
    data_is_null: bool,
    buffers: BufferPool<ResultField>,
}

impl ResultTree {
    pub fn new(buffers: BufferPool<ResultField>) -> Self {
        Self {
            maps: Vec::new(),
            lists: Vec::new(),
            root: None,
            data_is_null: false,
            buffers,
        }
    }

    /// Allocates a map for `size` fields. The first container created without a parent becomes
    /// the root of the tree.
    pub fn rent_result_map(&mut self, size: usize, parent: Option<ResultSlot>) -> ResultMapId {
        let mut fields = self.buffers.pop();
        fields.reserve(size);
        let id = ResultMapId(self.maps.len() as u32);
        self.maps.push(ResultMap {
            parent,
            fields,
            nulled: false,
        });
        if parent.is_none() && self.root.is_none() {
            self.root = Some(ResultContainer::Map(id));
        }
        id
    }

    pub fn push_field(&mut self, map: ResultMapId, key: Arc<str>, nullable: bool) -> ResultSlot {
        let fields = &mut self.maps[map.0 as usize].fields;
        let index = fields.len() as u32;
        fields.push(ResultField {
            key,
            value: ResultValue::Pending,
            nullable,
        });
        ResultSlot::Field { map, index }
    }

    pub fn new_list(&mut self, parent: Option<ResultSlot>, len: usize, items_nullable: bool) -> ResultListId {
        let id = ResultListId(self.lists.len() as u32);
        self.lists.push(ResultList {
            parent,
            items: vec![ResultValue::Pending; len],
            items_nullable,
            nulled: false,
        });
        if parent.is_none() && self.root.is_none() {
            self.root = Some(ResultContainer::List(id));
        }
        id
    }

    /// Writes the value of a slot. Each slot has a single writer: the task it was assigned to.
    pub fn set(&mut self, slot: ResultSlot, value: ResultValue) {
        let current = self.value_mut(slot);
        debug_assert!(
            matches!(current, ResultValue::Pending),
            "result slot {slot:?} written twice"
        );
        *current = value;
    }

    pub fn get(&self, slot: ResultSlot) -> &ResultValue {
        match slot {
            ResultSlot::Field { map, index } => &self.maps[map.0 as usize].fields[index as usize].value,
            ResultSlot::Item { list, index } => &self.lists[list.0 as usize].items[index as usize],
        }
    }

    fn value_mut(&mut self, slot: ResultSlot) -> &mut ResultValue {
        match slot {
            ResultSlot::Field { map, index } => &mut self.maps[map.0 as usize].fields[index as usize].value,
            ResultSlot::Item { list, index } => &mut self.lists[list.0 as usize].items[index as usize],
        }
    }

    pub fn is_nullable(&self, slot: ResultSlot) -> bool {
        match slot {
            ResultSlot::Field { map, index } => self.maps[map.0 as usize].fields[index as usize].nullable,
            ResultSlot::Item { list, .. } => self.lists[list.0 as usize].items_nullable,
        }
    }

    pub fn container_of(&self, slot: ResultSlot) -> ResultContainer {
        match slot {
            ResultSlot::Field { map, .. } => ResultContainer::Map(map),
            ResultSlot::Item { list, .. } => ResultContainer::List(list),
        }
    }

    pub fn parent_of(&self, container: ResultContainer) -> Option<ResultSlot> {
        match container {
            ResultContainer::Map(id) => self.maps[id.0 as usize].parent,
            ResultContainer::List(id) => self.lists[id.0 as usize].parent,
        }
    }

    pub fn is_nulled(&self, container: ResultContainer) -> bool {
        match container {
            ResultContainer::Map(id) => self.maps[id.0 as usize].nulled,
            ResultContainer::List(id) => self.lists[id.0 as usize].nulled,
        }
    }

    pub fn mark_nulled(&mut self, container: ResultContainer) {
        match container {
            ResultContainer::Map(id) => self.maps[id.0 as usize].nulled = true,
            ResultContainer::List(id) => self.lists[id.0 as usize].nulled = true,
        }
    }

    /// Replaces whatever the slot holds with null, used when a violation collapses a subtree.
    pub fn overwrite_with_null(&mut self, slot: ResultSlot) {
        *self.value_mut(slot) = ResultValue::Null;
    }

    /// Whether the container still shows up in the data, i.e. neither it nor any of its
    /// ancestors was replaced by a null.
    pub fn is_reachable(&self, container: ResultContainer) -> bool {
        let mut container = container;
        loop {
            if self.is_nulled(container) {
                return false;
            }
            let Some(parent_slot) = self.parent_of(container) else {
                return !self.data_is_null && self.root == Some(container);
            };
            let holds_container = match (self.get(parent_slot), container) {
                (ResultValue::Map(id), ResultContainer::Map(expected)) => *id == expected,
                (ResultValue::List(id), ResultContainer::List(expected)) => *id == expected,
                _ => false,
            };
            if !holds_container {
                return false;
            }
            container = self.container_of(parent_slot);
        }
    }

    pub fn null_data(&mut self) {
        self.data_is_null = true;
    }

    pub fn data_is_null(&self) -> bool {
        self.data_is_null
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    /// Converts the tree into JSON, giving the field buffers back for the next execution.
    pub fn into_data(mut self) -> (Option<Value>, BufferPool<ResultField>) {
        let data = match self.root {
            _ if self.data_is_null => None,
            None => None,
            Some(ResultContainer::Map(id)) => Some(self.take_map(id)),
            Some(ResultContainer::List(id)) => Some(self.take_list(id)),
        };
        // Whatever was not reachable from the root still holds a buffer.
        for map in &mut self.maps {
            let fields = std::mem::take(&mut map.fields);
            if fields.capacity() > 0 {
                self.buffers.push(fields);
            }
        }
        (data, self.buffers)
    }

    fn take_map(&mut self, id: ResultMapId) -> Value {
        let map = &mut self.maps[id.0 as usize];
        if map.nulled {
            return Value::Null;
        }
        let mut fields = std::mem::take(&mut map.fields);
        let mut object = serde_json::Map::with_capacity(fields.len());
        for field in fields.drain(..) {
            let value = self.take_value(field.value);
            object.insert(field.key.to_string(), value);
        }
        self.buffers.push(fields);
        Value::Object(object)
    }

    fn take_list(&mut self, id: ResultListId) -> Value {
        let list = &mut self.lists[id.0 as usize];
        if list.nulled {
            return Value::Null;
        }
        let items = std::mem::take(&mut list.items);
        Value::Array(items.into_iter().map(|item| self.take_value(item)).collect())
    }

    fn take_value(&mut self, value: ResultValue) -> Value {
        match value {
            ResultValue::Pending | ResultValue::Null => Value::Null,
            ResultValue::Leaf(value) => value,
            ResultValue::Map(id) => self.take_map(id),
            ResultValue::List(id) => self.take_list(id),
        }
    }
}
