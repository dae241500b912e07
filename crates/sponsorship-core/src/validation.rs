//! 保存前的业务校验
//!
//! 赞助聚合作为整体校验：赞助记录本身、嵌套物料、嵌套发货以及它们之间的关联。
//! 错误消息按字段顺序收集，最终以 ". " 连接成一条提示。

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::models::{SponsorShipment, SponsorSwag, Sponsorship, SponsorshipAggregate};

pub const BLANK: &str = "can't be blank";
pub const TAKEN: &str = "has already been taken";
pub const NEGATIVE: &str = "must be greater than or equal to 0";

/// 单个字段的错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// 字段路径，如 `name`、`shipments[1].track_no`
    pub field: String,
    /// 完整的用户提示
    pub message: String,
}

/// 校验失败结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    errors: Vec<FieldError>,
}

impl ValidationFailure {
    pub fn new() -> Self {
        Self::default()
    }

    /// 单条消息的校验失败
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut failure = Self::new();
        failure.add(field, message);
        failure
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_error_on(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// 合并另一组错误，保持原有顺序
    pub fn merge(&mut self, other: ValidationFailure) {
        self.errors.extend(other.errors);
    }

    /// 全部提示，以 ". " 连接
    pub fn full_messages(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(". ")
    }

    /// 无错误时返回 Ok
    pub fn into_result(self) -> Result<(), ValidationFailure> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_messages())
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// 校验赞助记录本身的字段
pub fn validate_sponsorship(sponsorship: &Sponsorship, failure: &mut ValidationFailure) {
    if is_blank(&sponsorship.name) {
        failure.add("name", format!("Name {BLANK}"));
    }

    if let Some(amount) = sponsorship.amount {
        if !amount.is_finite() || amount < 0.0 {
            failure.add("amount", format!("Amount {NEGATIVE}"));
        }
    }
}

/// 校验单个物料，`position` 从 1 开始，用于提示前缀
pub fn validate_swag(position: usize, swag: &SponsorSwag, failure: &mut ValidationFailure) {
    let prefix = format!("Swag item {position}");
    let path = format!("swags[{}]", position - 1);

    if is_blank(&swag.name) {
        failure.add(format!("{path}.name"), format!("{prefix}: Name {BLANK}"));
    }

    if matches!(swag.quantity, Some(q) if q < 0) {
        failure.add(
            format!("{path}.quantity"),
            format!("{prefix}: Quantity {NEGATIVE}"),
        );
    }
}

/// 校验单个发货记录的字段（不含跨记录的唯一性）
pub fn validate_shipment(
    position: usize,
    shipment: &SponsorShipment,
    failure: &mut ValidationFailure,
) {
    let prefix = format!("Shipment {position}");
    let path = format!("shipments[{}]", position - 1);

    if is_blank(&shipment.carrier) {
        failure.add(format!("{path}.carrier"), format!("{prefix}: Carrier {BLANK}"));
    }

    if is_blank(&shipment.track_no) {
        failure.add(
            format!("{path}.track_no"),
            format!("{prefix}: Tracking number {BLANK}"),
        );
    }

    match shipment.boxes {
        None => failure.add(format!("{path}.boxes"), format!("{prefix}: Boxes {BLANK}")),
        Some(boxes) if boxes < 0 => {
            failure.add(format!("{path}.boxes"), format!("{prefix}: Boxes {NEGATIVE}"))
        }
        Some(_) => {}
    }
}

/// 运单号重复的提示
pub fn tracking_number_taken(position: usize, failure: &mut ValidationFailure) {
    failure.add(
        format!("shipments[{}].track_no", position - 1),
        format!("Shipment {position}: Tracking number {TAKEN}"),
    );
}

impl SponsorshipAggregate {
    /// 整体校验（不含需要查库的运单号唯一性）
    pub fn validate(&self) -> ValidationFailure {
        let mut failure = ValidationFailure::new();

        validate_sponsorship(&self.sponsorship, &mut failure);

        for (index, swag) in self.swags.iter().enumerate() {
            validate_swag(index + 1, swag, &mut failure);
        }

        let own_swags: HashSet<i64> = self
            .swags
            .iter()
            .filter(|swag| swag.id > 0)
            .map(|swag| swag.id)
            .collect();
        let mut seen_track_numbers: HashMap<&str, usize> = HashMap::new();

        for (index, shipment) in self.shipments.iter().enumerate() {
            let position = index + 1;
            validate_shipment(position, shipment, &mut failure);

            let track_no = shipment.track_no.trim();
            if !track_no.is_empty() && seen_track_numbers.insert(track_no, position).is_some() {
                tracking_number_taken(position, &mut failure);
            }

            if shipment.swag_ids.iter().any(|id| !own_swags.contains(id)) {
                failure.add(
                    format!("shipments[{index}].swag_ids"),
                    format!("Shipment {position}: Swag items must belong to the same sponsorship"),
                );
            }
        }

        failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_aggregate() -> SponsorshipAggregate {
        let mut sponsorship = Sponsorship::draft(1, None);
        sponsorship.id = 1;
        sponsorship.name = "Acme Corp".to_string();

        let mut aggregate = SponsorshipAggregate::new(sponsorship);
        aggregate.swags.push(SponsorSwag {
            id: 5,
            ..SponsorSwag::new(1, "Stickers", Some(500))
        });
        aggregate.shipments.push(SponsorShipment {
            id: 9,
            swag_ids: vec![5],
            ..SponsorShipment::new(1, "DHL", "JD0001", Some(3))
        });
        aggregate
    }

    #[test]
    fn test_valid_aggregate_passes() {
        assert!(valid_aggregate().validate().is_empty());
    }

    #[test]
    fn test_blank_name() {
        let mut aggregate = valid_aggregate();
        aggregate.sponsorship.name = "   ".to_string();

        let failure = aggregate.validate();
        assert!(failure.has_error_on("name"));
        assert!(failure.full_messages().contains("Name can't be blank"));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut aggregate = valid_aggregate();
        aggregate.sponsorship.amount = Some(-1.0);
        assert!(aggregate.validate().has_error_on("amount"));

        aggregate.sponsorship.amount = Some(0.0);
        assert!(aggregate.validate().is_empty());
    }

    #[test]
    fn test_swag_quantity_rules() {
        let cases = [(None, true), (Some(0), true), (Some(12), true), (Some(-1), false)];

        for (quantity, valid) in cases {
            let mut aggregate = valid_aggregate();
            aggregate.swags[0].quantity = quantity;
            assert_eq!(
                aggregate.validate().is_empty(),
                valid,
                "quantity {quantity:?}"
            );
        }
    }

    #[test]
    fn test_shipment_required_fields() {
        let mut aggregate = valid_aggregate();
        aggregate.shipments[0].carrier = String::new();
        aggregate.shipments[0].track_no = String::new();
        aggregate.shipments[0].boxes = None;

        let failure = aggregate.validate();
        assert_eq!(
            failure.full_messages(),
            "Shipment 1: Carrier can't be blank. \
             Shipment 1: Tracking number can't be blank. \
             Shipment 1: Boxes can't be blank"
        );
    }

    #[test]
    fn test_negative_boxes_rejected() {
        let mut aggregate = valid_aggregate();
        aggregate.shipments[0].boxes = Some(-2);
        assert!(aggregate.validate().has_error_on("shipments[0].boxes"));
    }

    #[test]
    fn test_duplicate_track_no_within_submission() {
        let mut aggregate = valid_aggregate();
        aggregate
            .shipments
            .push(SponsorShipment::new(1, "UPS", " JD0001 ", Some(1)));

        let failure = aggregate.validate();
        assert!(failure.has_error_on("shipments[1].track_no"));
        assert!(
            failure
                .full_messages()
                .contains("Shipment 2: Tracking number has already been taken")
        );
    }

    #[test]
    fn test_foreign_swag_link_rejected() {
        let mut aggregate = valid_aggregate();
        aggregate.shipments[0].swag_ids.push(77);

        assert!(aggregate.validate().has_error_on("shipments[0].swag_ids"));
    }

    #[test]
    fn test_messages_keep_order() {
        let mut aggregate = valid_aggregate();
        aggregate.sponsorship.name = String::new();
        aggregate.swags[0].name = String::new();

        assert_eq!(
            aggregate.validate().full_messages(),
            "Name can't be blank. Swag item 1: Name can't be blank"
        );
    }
}
