use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{
    customer::{
        Customer, CustomerError, CustomerId, CustomerRegistration, CustomerRepository,
        CustomerUpdate, NewCustomer,
    },
    DataAccessError, Entity,
};

/// 顧客サービス
#[derive(Clone)]
pub struct CustomerService {
    repository: Arc<dyn CustomerRepository>,
}

impl CustomerService {
    pub fn new(repository: Arc<dyn CustomerRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_all_customers(&self) -> Result<Vec<Customer>, ServiceError> {
        Ok(self.repository.find_all().await?)
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer, ServiceError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    /// 顧客を登録する。メールアドレスが使用済みなら`Conflict`
    pub async fn add_customer(
        &self,
        registration: CustomerRegistration,
    ) -> Result<Customer, ServiceError> {
        let customer = NewCustomer::try_from(registration)?;
        if self.repository.exists_by_email(customer.email()).await? {
            debug!("使用済みのメールアドレス: {}", customer.email());
            return Err(ServiceError::Conflict);
        }
        let customer = self
            .repository
            .insert(customer)
            .await
            .map_err(conflict_on_unique_violation)?;
        info!("顧客を登録しました: {}", customer.id());
        Ok(customer)
    }

    pub async fn delete_customer_by_id(&self, id: CustomerId) -> Result<(), ServiceError> {
        if !self.repository.exists_by_id(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        // 確認後に別のリクエストで削除されていれば行は無い
        if !self.repository.delete_by_id(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        info!("顧客を削除しました: {}", id);
        Ok(())
    }

    /// 指定された項目のうち現在値と異なるものだけを更新する
    pub async fn update_customer(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> Result<Customer, ServiceError> {
        let current = self.get_customer(id).await?;
        let updated = current.merge(&update)?.ok_or(ServiceError::NoChanges)?;
        if let Some(email) = current.changed_email(&update) {
            if self.repository.exists_by_email(email).await? {
                debug!("使用済みのメールアドレス: {}", email);
                return Err(ServiceError::Conflict);
            }
        }
        let stored = self
            .repository
            .update(&updated)
            .await
            .map_err(conflict_on_unique_violation)?;
        if !stored {
            return Err(ServiceError::NotFound(id));
        }
        info!("顧客を更新しました: {}", id);
        Ok(updated)
    }
}

fn conflict_on_unique_violation(error: DataAccessError) -> ServiceError {
    match error {
        DataAccessError::UniqueViolation(_) => ServiceError::Conflict,
        e => ServiceError::DataAccess(e),
    }
}

/// 顧客サービスエラー
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Customer with id [{0}] not found")]
    NotFound(CustomerId),
    #[error("Email already taken")]
    Conflict,
    #[error("No data changes found")]
    NoChanges,
    #[error(transparent)]
    InvalidCustomer(#[from] CustomerError),
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}

impl ServiceError {
    /// 入力内容に起因するエラーか
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::NoChanges | Self::InvalidCustomer(_))
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::domain::customer::MockCustomerRepository;

    fn service(repository: MockCustomerRepository) -> CustomerService {
        CustomerService::new(Arc::new(repository))
    }

    fn customer(id: u64) -> Customer {
        Customer::new(
            id.into(),
            "Test name".to_owned(),
            "test@gmail.com".to_owned(),
            11,
        )
    }

    #[tokio::test]
    async fn test_get_all_customers() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_find_all()
            .times(1)
            .returning(|| Ok(vec![customer(1), customer(2)]));

        let customers = service(repository).get_all_customers().await.unwrap();
        assert_eq!(customers.len(), 2);
    }

    #[tokio::test]
    async fn test_get_customer() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_find_by_id()
            .with(eq(CustomerId::from(1)))
            .returning(|id| Ok(Some(customer(*id))));

        let returned = service(repository)
            .get_customer(CustomerId::from(1))
            .await
            .unwrap();
        assert_eq!(returned, customer(1));
    }

    #[tokio::test]
    async fn test_get_customer_not_found() {
        let mut repository = MockCustomerRepository::new();
        repository.expect_find_by_id().returning(|_| Ok(None));

        let error = service(repository)
            .get_customer(CustomerId::from(1))
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::NotFound(id) if id == CustomerId::from(1)));
        assert_eq!(error.to_string(), "Customer with id [1] not found");
    }

    #[tokio::test]
    async fn test_add_customer() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_exists_by_email()
            .withf(|email| email == "test@gmail.com")
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_insert()
            .withf(|customer| {
                customer.name() == "Test name"
                    && customer.email() == "test@gmail.com"
                    && customer.age() == 20
            })
            .times(1)
            .returning(|customer| Ok(customer.into_customer(CustomerId::from(5))));

        let registered = service(repository)
            .add_customer(CustomerRegistration {
                name: "Test name".to_owned(),
                email: "test@gmail.com".to_owned(),
                age: 20,
            })
            .await
            .unwrap();
        assert_eq!(registered.id(), CustomerId::from(5));
        assert_eq!(registered.email(), "test@gmail.com");
    }

    #[tokio::test]
    async fn test_add_customer_existing_email() {
        let mut repository = MockCustomerRepository::new();
        repository.expect_exists_by_email().returning(|_| Ok(true));
        repository.expect_insert().never();

        let error = service(repository)
            .add_customer(CustomerRegistration {
                name: "Test name".to_owned(),
                email: "test@gmail.com".to_owned(),
                age: 20,
            })
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::Conflict));
        assert_eq!(error.to_string(), "Email already taken");
    }

    #[tokio::test]
    async fn test_add_customer_unique_violation() {
        let mut repository = MockCustomerRepository::new();
        repository.expect_exists_by_email().returning(|_| Ok(false));
        repository.expect_insert().returning(|_| {
            Err(DataAccessError::UniqueViolation(
                "UNIQUE constraint failed: customer.email".to_owned(),
            ))
        });

        let error = service(repository)
            .add_customer(CustomerRegistration {
                name: "Test name".to_owned(),
                email: "test@gmail.com".to_owned(),
                age: 20,
            })
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::Conflict));
    }

    #[tokio::test]
    async fn test_add_customer_invalid() {
        let mut repository = MockCustomerRepository::new();
        repository.expect_exists_by_email().never();
        repository.expect_insert().never();

        let error = service(repository)
            .add_customer(CustomerRegistration {
                name: "".to_owned(),
                email: "test@gmail.com".to_owned(),
                age: 20,
            })
            .await
            .unwrap_err();
        assert!(error.is_validation());
        assert!(matches!(
            error,
            ServiceError::InvalidCustomer(CustomerError::NameIsBlank)
        ));
    }

    #[tokio::test]
    async fn test_delete_customer_by_id() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_exists_by_id()
            .with(eq(CustomerId::from(1)))
            .returning(|_| Ok(true));
        repository
            .expect_delete_by_id()
            .with(eq(CustomerId::from(1)))
            .times(1)
            .returning(|_| Ok(true));

        service(repository)
            .delete_customer_by_id(CustomerId::from(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_customer_by_id_not_found() {
        let mut repository = MockCustomerRepository::new();
        repository.expect_exists_by_id().returning(|_| Ok(false));
        repository.expect_delete_by_id().never();

        let error = service(repository)
            .delete_customer_by_id(CustomerId::from(1))
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Customer with id [1] not found");
    }

    #[tokio::test]
    async fn test_delete_customer_removed_before_delete() {
        let mut repository = MockCustomerRepository::new();
        repository.expect_exists_by_id().returning(|_| Ok(true));
        repository
            .expect_delete_by_id()
            .times(1)
            .returning(|_| Ok(false));

        let error = service(repository)
            .delete_customer_by_id(CustomerId::from(1))
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_customer_all_fields() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_find_by_id()
            .returning(|id| Ok(Some(customer(*id))));
        repository
            .expect_exists_by_email()
            .withf(|email| email == "test-updated@gmail.com")
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_update()
            .withf(|customer| {
                customer.id() == CustomerId::from(1)
                    && customer.name() == "Test name updated"
                    && customer.email() == "test-updated@gmail.com"
                    && customer.age() == 22
            })
            .times(1)
            .returning(|_| Ok(true));

        let updated = service(repository)
            .update_customer(
                CustomerId::from(1),
                CustomerUpdate {
                    name: Some("Test name updated".to_owned()),
                    email: Some("test-updated@gmail.com".to_owned()),
                    age: Some(22),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.age(), 22);
    }

    #[tokio::test]
    async fn test_update_customer_name_only() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_find_by_id()
            .returning(|id| Ok(Some(customer(*id))));
        repository.expect_exists_by_email().never();
        repository
            .expect_update()
            .withf(|customer| {
                customer.name() == "Updated"
                    && customer.email() == "test@gmail.com"
                    && customer.age() == 11
            })
            .times(1)
            .returning(|_| Ok(true));

        service(repository)
            .update_customer(
                CustomerId::from(1),
                CustomerUpdate {
                    name: Some("Updated".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_customer_existing_email() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_find_by_id()
            .returning(|id| Ok(Some(customer(*id))));
        repository.expect_exists_by_email().returning(|_| Ok(true));
        repository.expect_update().never();

        let error = service(repository)
            .update_customer(
                CustomerId::from(1),
                CustomerUpdate {
                    email: Some("test-updated@gmail.com".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::Conflict));
    }

    #[tokio::test]
    async fn test_update_customer_unique_violation() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_find_by_id()
            .returning(|id| Ok(Some(customer(*id))));
        repository.expect_exists_by_email().returning(|_| Ok(false));
        repository.expect_update().times(1).returning(|_| {
            Err(DataAccessError::UniqueViolation(
                "UNIQUE constraint failed: customer.email".to_owned(),
            ))
        });

        let error = service(repository)
            .update_customer(
                CustomerId::from(1),
                CustomerUpdate {
                    email: Some("test-updated@gmail.com".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::Conflict));
    }

    #[tokio::test]
    async fn test_update_customer_removed_before_update() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_find_by_id()
            .returning(|id| Ok(Some(customer(*id))));
        repository.expect_update().times(1).returning(|_| Ok(false));

        let error = service(repository)
            .update_customer(
                CustomerId::from(1),
                CustomerUpdate {
                    age: Some(30),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::NotFound(id) if id == CustomerId::from(1)));
    }

    #[tokio::test]
    async fn test_update_customer_no_changes() {
        let mut repository = MockCustomerRepository::new();
        repository
            .expect_find_by_id()
            .returning(|id| Ok(Some(customer(*id))));
        repository.expect_exists_by_email().never();
        repository.expect_update().never();

        let service = service(repository);
        let same = CustomerUpdate {
            name: Some("Test name".to_owned()),
            email: Some("test@gmail.com".to_owned()),
            age: Some(11),
        };
        for update in [CustomerUpdate::default(), same] {
            let error = service
                .update_customer(CustomerId::from(1), update)
                .await
                .unwrap_err();
            assert!(error.is_validation());
            assert_eq!(error.to_string(), "No data changes found");
        }
    }

    #[tokio::test]
    async fn test_update_customer_not_found() {
        let mut repository = MockCustomerRepository::new();
        repository.expect_find_by_id().returning(|_| Ok(None));
        repository.expect_update().never();

        let error = service(repository)
            .update_customer(
                CustomerId::from(9),
                CustomerUpdate {
                    name: Some("Updated".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::NotFound(_)));
    }
}
