pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    certificate_service::CertificateService, enrollment_service::EnrollmentService,
    entitlement_service::EntitlementService, exam_service::ExamService,
    notification_service::NotificationService,
};
use crate::store::RecordStore;
use crate::utils::time::Clock;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub clock: Arc<dyn Clock>,
    pub exam_service: ExamService,
    pub enrollment_service: EnrollmentService,
    pub entitlement_service: EntitlementService,
    pub certificate_service: CertificateService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        let enrollment_service = EnrollmentService::new(store.clone());
        let notification_service = NotificationService::new(store.clone());
        let exam_service =
            ExamService::new(store.clone(), clock.clone(), enrollment_service.clone());
        let entitlement_service =
            EntitlementService::new(store.clone(), clock.clone(), notification_service.clone());
        let certificate_service = CertificateService::new(store.clone());

        Self {
            store,
            clock,
            exam_service,
            enrollment_service,
            entitlement_service,
            certificate_service,
            notification_service,
        }
    }
}
