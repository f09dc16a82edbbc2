use std::collections::BTreeMap;

use tokio::sync::RwLock;

use crate::domain::{DataAccessError, Entity, Id};

/// プロセス内でエンティティを保持するテーブル。IDは1から採番し、再利用しない
#[derive(Debug)]
pub struct MemoryTable<E: Entity> {
    state: RwLock<TableState<E>>,
}

#[derive(Debug)]
struct TableState<E: Entity> {
    rows: BTreeMap<E::Id, E>,
    last_id: u64,
}

impl<E> MemoryTable<E>
where
    E: Entity,
    E::Id: Id<Inner = u64>,
{
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: impl IntoIterator<Item = E>) -> Self {
        let rows = rows
            .into_iter()
            .map(|e| (e.id(), e))
            .collect::<BTreeMap<_, _>>();
        let last_id = rows.keys().map(|id| **id).max().unwrap_or(0);
        Self {
            state: RwLock::new(TableState { rows, last_id }),
        }
    }

    pub async fn all(&self) -> Vec<E> {
        self.state.read().await.rows.values().cloned().collect()
    }

    pub async fn get(&self, id: E::Id) -> Option<E> {
        self.state.read().await.rows.get(&id).cloned()
    }

    pub async fn contains(&self, id: E::Id) -> bool {
        self.state.read().await.rows.contains_key(&id)
    }

    pub async fn any<F>(&self, predicate: F) -> bool
    where
        F: Fn(&E) -> bool,
    {
        self.state.read().await.rows.values().any(predicate)
    }

    /// 次のIDでエンティティを生成して追加する。IDを使い切っていればエラー
    pub async fn insert_with<F>(&self, create: F) -> Result<E, DataAccessError>
    where
        F: FnOnce(E::Id) -> E,
    {
        let mut state = self.state.write().await;
        let next_id = state.last_id.checked_add(1).ok_or_else(|| {
            DataAccessError::WriteError(format!("{} id sequence exhausted", E::ENTITY_NAME).into())
        })?;
        state.last_id = next_id;
        let entity = create(E::Id::from(next_id));
        state.rows.insert(entity.id(), entity.clone());
        Ok(entity)
    }

    /// 既存の行を置き換える。行が無ければ`false`
    pub async fn replace(&self, entity: E) -> bool {
        let mut state = self.state.write().await;
        match state.rows.get_mut(&entity.id()) {
            Some(row) => {
                *row = entity;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: E::Id) -> bool {
        self.state.write().await.rows.remove(&id).is_some()
    }
}

impl<E> Default for MemoryTable<E>
where
    E: Entity,
    E::Id: Id<Inner = u64>,
{
    fn default() -> Self {
        Self::new()
    }
}
