use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sha2::Sha512;
use tracing::instrument;
use url::form_urlencoded;

use crate::config::VnpayConfig;
use crate::errors::ServiceError;
use crate::models::PaymentInfo;

type HmacSha512 = Hmac<Sha512>;

const VNP_VERSION: &str = "2.1.0";
const VNP_COMMAND: &str = "pay";
const VNP_CURRENCY: &str = "VND";
const VNP_LOCALE: &str = "vn";
const VNP_ORDER_TYPE: &str = "other";
const VNP_SUCCESS_CODE: &str = "00";
/// Create/expire dates are expressed in the gateway's local zone (GMT+7).
const GATEWAY_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Outcome of a gateway redirect captured from the embedded browser.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayReturn {
    Completed { payment_info: PaymentInfo },
    Failed { response_code: String },
}

/// Builds signed VNPay payment requests and classifies return redirects.
///
/// The request contract: parameters sorted alphabetically, values
/// form-urlencoded (space as `+`), joined with `&`, signed with HMAC-SHA512
/// over the shared secret, the hex digest appended as `vnp_SecureHash`.
/// Amounts travel in minor units (the listed amount × 100).
#[derive(Clone)]
pub struct VnpayGateway {
    config: VnpayConfig,
}

impl VnpayGateway {
    pub fn new(config: VnpayConfig) -> Self {
        Self { config }
    }

    /// Builds the signed payment-page URL for one order reference.
    #[instrument(skip(self))]
    pub fn payment_url(
        &self,
        reference: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        let amount_minor = (amount * Decimal::from(100))
            .trunc()
            .to_i64()
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("amount {} out of range", amount))
            })?;
        if amount_minor <= 0 {
            return Err(ServiceError::ValidationError(
                "payment amount must be positive".to_string(),
            ));
        }

        let zone = gateway_zone();
        let create_date = now.with_timezone(&zone).format("%Y%m%d%H%M%S").to_string();
        let expire_date = (now + Duration::minutes(self.config.expire_minutes))
            .with_timezone(&zone)
            .format("%Y%m%d%H%M%S")
            .to_string();

        let mut params = vec![
            ("vnp_Version", VNP_VERSION.to_string()),
            ("vnp_Command", VNP_COMMAND.to_string()),
            ("vnp_TmnCode", self.config.tmn_code.clone()),
            ("vnp_Amount", amount_minor.to_string()),
            ("vnp_CurrCode", VNP_CURRENCY.to_string()),
            ("vnp_TxnRef", reference.to_string()),
            (
                "vnp_OrderInfo",
                format!("Thanh toan don hang:{}", reference),
            ),
            ("vnp_OrderType", VNP_ORDER_TYPE.to_string()),
            ("vnp_Locale", VNP_LOCALE.to_string()),
            ("vnp_ReturnUrl", self.config.return_url.clone()),
            ("vnp_IpAddr", "0:0:0:0:0:0:0:1".to_string()),
            ("vnp_CreateDate", create_date),
            ("vnp_ExpireDate", expire_date),
        ];
        params.sort_by(|a, b| a.0.cmp(b.0));

        let mut hash_parts = Vec::with_capacity(params.len());
        let mut query_parts = Vec::with_capacity(params.len());
        for (key, value) in &params {
            if value.is_empty() {
                continue;
            }
            let encoded_value = form_encode(value);
            hash_parts.push(format!("{}={}", key, encoded_value));
            query_parts.push(format!("{}={}", form_encode(key), encoded_value));
        }

        let sign_data = hash_parts.join("&");
        let mut mac = HmacSha512::new_from_slice(self.config.hash_secret.as_bytes())
            .map_err(|e| ServiceError::ValidationError(format!("invalid hash secret: {}", e)))?;
        mac.update(sign_data.as_bytes());
        let secure_hash = hex::encode(mac.finalize().into_bytes());

        Ok(format!(
            "{}?{}&vnp_SecureHash={}",
            self.config.payment_url,
            query_parts.join("&"),
            secure_hash
        ))
    }

    /// Classifies a navigated URL from the embedded browser.
    ///
    /// Returns `None` for URLs that are not the gateway's return redirect.
    /// On the return redirect, `vnp_ResponseCode == "00"` means the payment
    /// completed; anything else (including a missing code) is a failure.
    pub fn classify_return(&self, url: &str) -> Option<GatewayReturn> {
        if !self.is_return_url(url) {
            return None;
        }

        let parsed = url::Url::parse(url).ok()?;
        let mut response_code = None;
        let mut transaction_id = None;
        let mut pay_date = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "vnp_ResponseCode" => response_code = Some(value.into_owned()),
                "vnp_TransactionNo" => transaction_id = Some(value.into_owned()),
                "vnp_PayDate" => pay_date = Some(value.into_owned()),
                _ => {}
            }
        }

        match response_code.as_deref() {
            Some(VNP_SUCCESS_CODE) => Some(GatewayReturn::Completed {
                payment_info: PaymentInfo {
                    transaction_id,
                    paid_at: pay_date
                        .as_deref()
                        .and_then(parse_gateway_date)
                        .or_else(|| Some(Utc::now())),
                },
            }),
            Some(code) => Some(GatewayReturn::Failed {
                response_code: code.to_string(),
            }),
            None => Some(GatewayReturn::Failed {
                response_code: "missing".to_string(),
            }),
        }
    }

    fn is_return_url(&self, url: &str) -> bool {
        url.starts_with(&self.config.return_url) || url.contains("/payment-result")
    }
}

/// application/x-www-form-urlencoded encoding, the Java `URLEncoder`
/// convention the gateway verifies against (space becomes `+`).
fn form_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn gateway_zone() -> FixedOffset {
    FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECS).expect("GMT+7 is a valid offset")
}

/// Parses the gateway's `yyyyMMddHHmmss` timestamps (GMT+7).
fn parse_gateway_date(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S").ok()?;
    naive
        .and_local_timezone(gateway_zone())
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
