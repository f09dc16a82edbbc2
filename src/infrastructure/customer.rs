use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::domain::customer::{Customer, CustomerId, CustomerRepository, NewCustomer};
use crate::domain::{DataAccessError, Entity};
use crate::infrastructure::MemoryTable;

/// customerテーブルを使う顧客リポジトリ
#[derive(Clone, Debug)]
pub struct SqlCustomerRepository {
    pool: SqlitePool,
}

impl SqlCustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CustomerRow {
    id: i64,
    name: String,
    email: String,
    age: i64,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DataAccessError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let id = u64::try_from(row.id).map_err(|e| DataAccessError::ReadError(Box::new(e)))?;
        let age = u32::try_from(row.age).map_err(|e| DataAccessError::ReadError(Box::new(e)))?;
        Ok(Customer::new(id.into(), row.name, row.email, age))
    }
}

// SQLiteのrowidは63bitなので、範囲外のIDはどの行にも一致しない
fn row_id(id: CustomerId) -> i64 {
    i64::try_from(*id).unwrap_or(-1)
}

#[async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_all(&self) -> Result<Vec<Customer>, DataAccessError> {
        sqlx::query_as::<_, CustomerRow>("SELECT id, name, email, age FROM customer ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Customer::try_from)
            .collect()
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DataAccessError> {
        sqlx::query_as::<_, CustomerRow>("SELECT id, name, email, age FROM customer WHERE id = ?")
            .bind(row_id(id))
            .fetch_optional(&self.pool)
            .await?
            .map(Customer::try_from)
            .transpose()
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DataAccessError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customer WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn exists_by_id(&self, id: CustomerId) -> Result<bool, DataAccessError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customer WHERE id = ?")
            .bind(row_id(id))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, customer: NewCustomer) -> Result<Customer, DataAccessError> {
        let result = sqlx::query("INSERT INTO customer (name, email, age) VALUES (?, ?, ?)")
            .bind(customer.name())
            .bind(customer.email())
            .bind(i64::from(customer.age()))
            .execute(&self.pool)
            .await?;
        let id = u64::try_from(result.last_insert_rowid())
            .map_err(|e| DataAccessError::WriteError(Box::new(e)))?;
        debug!("Insert {} = {}", Customer::ENTITY_NAME, id);
        Ok(customer.into_customer(id.into()))
    }

    async fn update(&self, customer: &Customer) -> Result<bool, DataAccessError> {
        let result = sqlx::query("UPDATE customer SET name = ?, email = ?, age = ? WHERE id = ?")
            .bind(customer.name())
            .bind(customer.email())
            .bind(i64::from(customer.age()))
            .bind(row_id(customer.id()))
            .execute(&self.pool)
            .await?;
        debug!("Update {} = {}", Customer::ENTITY_NAME, result.rows_affected());
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, id: CustomerId) -> Result<bool, DataAccessError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(row_id(id))
            .execute(&self.pool)
            .await?;
        debug!("Delete {} = {}", Customer::ENTITY_NAME, result.rows_affected());
        Ok(result.rows_affected() > 0)
    }
}

/// プロセス内に顧客を保持するリポジトリ。メールアドレスの一意性は保証しない
#[derive(Debug, Default)]
pub struct InMemoryCustomerRepository {
    table: MemoryTable<Customer>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(customers: impl IntoIterator<Item = Customer>) -> Self {
        Self {
            table: MemoryTable::with_rows(customers),
        }
    }

    /// デモ用の顧客2名を登録した状態で作成する
    pub fn with_demo_customers() -> Self {
        Self::with_customers([
            Customer::new(CustomerId::from(1), "Alex".to_owned(), "alex@gmail.com".to_owned(), 11),
            Customer::new(CustomerId::from(2), "Jamila".to_owned(), "jamila@gmail.com".to_owned(), 22),
        ])
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_all(&self) -> Result<Vec<Customer>, DataAccessError> {
        Ok(self.table.all().await)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DataAccessError> {
        Ok(self.table.get(id).await)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DataAccessError> {
        Ok(self.table.any(|c| c.email() == email).await)
    }

    async fn exists_by_id(&self, id: CustomerId) -> Result<bool, DataAccessError> {
        Ok(self.table.contains(id).await)
    }

    async fn insert(&self, customer: NewCustomer) -> Result<Customer, DataAccessError> {
        self.table
            .insert_with(|id| customer.into_customer(id))
            .await
    }

    async fn update(&self, customer: &Customer) -> Result<bool, DataAccessError> {
        Ok(self.table.replace(customer.clone()).await)
    }

    async fn delete_by_id(&self, id: CustomerId) -> Result<bool, DataAccessError> {
        Ok(self.table.remove(id).await)
    }
}
