use async_trait::async_trait;
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::domain::{DataAccessError, Entity, Id};

/// 顧客リポジトリ
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// 全顧客を取得する
    async fn find_all(&self) -> Result<Vec<Customer>, DataAccessError>;
    /// 顧客をIDで検索する
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DataAccessError>;
    /// メールアドレスが登録済みか確認する
    async fn exists_by_email(&self, email: &str) -> Result<bool, DataAccessError>;
    /// IDが登録済みか確認する
    async fn exists_by_id(&self, id: CustomerId) -> Result<bool, DataAccessError>;
    /// 顧客を登録し、採番済みの顧客を返す
    async fn insert(&self, customer: NewCustomer) -> Result<Customer, DataAccessError>;
    /// 顧客を上書きする
    async fn update(&self, customer: &Customer) -> Result<bool, DataAccessError>;
    /// 顧客を削除する
    async fn delete_by_id(&self, id: CustomerId) -> Result<bool, DataAccessError>;
}

/// 顧客ID
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Deref,
)]
pub struct CustomerId(u64);

impl Id for CustomerId {
    type Inner = u64;
}

/// 顧客エンティティ
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    email: String,
    age: u32,
}

impl Customer {
    pub fn new(id: CustomerId, name: String, email: String, age: u32) -> Self {
        Self {
            id,
            name,
            email,
            age,
        }
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn email(&self) -> &String {
        &self.email
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    /// 現在値と異なるメールアドレスが指定されていればそれを返す
    pub fn changed_email<'a>(&self, update: &'a CustomerUpdate) -> Option<&'a str> {
        update.email.as_deref().filter(|email| *email != self.email)
    }

    /// 変更のあった項目だけを反映した新しい顧客を返す。変更が無ければ`None`
    pub fn merge(&self, update: &CustomerUpdate) -> Result<Option<Customer>, CustomerError> {
        let name = update.name.as_ref().filter(|name| **name != self.name);
        let email = self.changed_email(update);
        let age = update.age.filter(|age| *age != self.age);
        if name.is_none() && email.is_none() && age.is_none() {
            return Ok(None);
        }
        if let Some(name) = name {
            validate_name(name)?;
        }
        if let Some(email) = email {
            validate_email(email)?;
        }
        if let Some(age) = age {
            validate_age(age)?;
        }
        Ok(Some(Customer {
            id: self.id,
            name: name.cloned().unwrap_or_else(|| self.name.clone()),
            email: email.map(str::to_owned).unwrap_or_else(|| self.email.clone()),
            age: age.unwrap_or(self.age),
        }))
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    const ENTITY_NAME: &'static str = "customer";

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// 未採番の顧客
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCustomer {
    name: String,
    email: String,
    age: u32,
}

impl NewCustomer {
    pub fn create(name: String, email: String, age: u32) -> Result<Self, CustomerError> {
        validate_name(&name)?;
        validate_email(&email)?;
        validate_age(age)?;
        Ok(Self { name, email, age })
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn email(&self) -> &String {
        &self.email
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    /// 採番されたIDを付与して顧客にする
    pub fn into_customer(self, id: CustomerId) -> Customer {
        Customer::new(id, self.name, self.email, self.age)
    }
}

impl TryFrom<CustomerRegistration> for NewCustomer {
    type Error = CustomerError;

    fn try_from(value: CustomerRegistration) -> Result<Self, Self::Error> {
        Self::create(value.name, value.email, value.age)
    }
}

/// 顧客登録リクエスト
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRegistration {
    pub name: String,
    pub email: String,
    pub age: u32,
}

/// 顧客更新リクエスト。`None`の項目は変更しない
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

fn validate_name(name: &str) -> Result<(), CustomerError> {
    match name.trim().is_empty() {
        true => Err(CustomerError::NameIsBlank),
        false => Ok(()),
    }
}

fn validate_email(email: &str) -> Result<(), CustomerError> {
    match email.trim().is_empty() {
        true => Err(CustomerError::EmailIsBlank),
        false => Ok(()),
    }
}

fn validate_age(age: u32) -> Result<(), CustomerError> {
    match age {
        0 => Err(CustomerError::AgeIsZero),
        _ => Ok(()),
    }
}

/// 顧客エラー
#[derive(Error, Display, Debug, PartialEq, Eq)]
pub enum CustomerError {
    /// 名前が空欄です
    #[display(fmt = "Name cannot be blank")]
    NameIsBlank,
    /// メールアドレスが空欄です
    #[display(fmt = "Email cannot be blank")]
    EmailIsBlank,
    /// 年齢が0です
    #[display(fmt = "Age must be a positive integer")]
    AgeIsZero,
}
