pub mod certificate_service;
pub mod enrollment_service;
pub mod entitlement_service;
pub mod exam_service;
pub mod grading_service;
pub mod notification_service;
