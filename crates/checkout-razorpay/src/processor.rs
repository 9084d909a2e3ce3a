//! # RazorPay Processor
//!
//! Hosted payment page flow built on RazorPay payment links:
//!
//! 1. `get_transaction_parameters` creates a payment link for the basket
//!    and records it under the link id.
//! 2. The customer pays on the hosted page and RazorPay redirects back
//!    to the callback URL.
//! 3. `handle_processor_response` verifies the callback signature.
//! 4. `issue_credit` refunds through the payments API.

use crate::client::{CreatePaymentLinkRequest, Payment, RazorPayClient, RefundRequest};
use crate::config::RazorPayConfig;
use crate::signature::{PaymentLinkCallback, PAYMENT_ID_PARAM};
use async_trait::async_trait;
use checkout_core::{
    Basket, HandledProcessorResponse, Money, PaymentError, PaymentProcessor, PaymentResult,
    ProcessorResponse, ProcessorResponseEntry, ProcessorResponseStore, Site,
    TransactionParameters,
};
use chrono::{Duration, Utc};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// RazorPay payment processor
pub struct RazorPay {
    client: RazorPayClient,
    site: Site,
    responses: Arc<dyn ProcessorResponseStore>,
}

impl RazorPay {
    pub const NAME: &'static str = "razorpay";
    pub const TITLE: &'static str = "RazorPay";

    /// Label recorded in place of a card number
    pub const CARD_LABEL: &'static str = "RazorPay";

    pub fn new(
        config: RazorPayConfig,
        site: Site,
        responses: Arc<dyn ProcessorResponseStore>,
    ) -> PaymentResult<Self> {
        Ok(Self {
            client: RazorPayClient::new(config)?,
            site,
            responses,
        })
    }

    /// Create from environment variables
    pub fn from_env(site: Site, responses: Arc<dyn ProcessorResponseStore>) -> PaymentResult<Self> {
        Self::new(RazorPayConfig::from_env()?, site, responses)
    }

    pub fn config(&self) -> &RazorPayConfig {
        self.client.config()
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn callback_url(&self) -> String {
        self.site.ecommerce_url(&self.callback_path())
    }

    /// Fetch a payment as RazorPay currently reports it
    pub async fn fetch_payment_details(&self, payment_id: &str) -> PaymentResult<Payment> {
        Ok(self.client.fetch_payment(payment_id).await?.body)
    }

    /// Target for the storefront's redirect handler: the hosted page
    /// with the basket id appended. Only RazorPay payment page hosts are
    /// accepted.
    pub fn hosted_page_redirect(
        &self,
        redirect_url: &str,
        basket_id: Option<&str>,
    ) -> PaymentResult<String> {
        let mut url = Url::parse(redirect_url).map_err(|e| {
            PaymentError::InvalidRequest(format!("Invalid redirect URL {}: {}", redirect_url, e))
        })?;

        let allowed = url.scheme() == "https"
            && url
                .host_str()
                .map(|host| self.config().is_payment_page_host(host))
                .unwrap_or(false);
        if !allowed {
            return Err(PaymentError::InvalidRequest(format!(
                "Redirect target is not a RazorPay payment page: {}",
                redirect_url
            )));
        }

        if let Some(basket_id) = basket_id {
            url.query_pairs_mut()
                .append_pair("ecommerce_basket_id", basket_id);
        }
        Ok(url.to_string())
    }

    async fn record_processor_response(
        &self,
        response: serde_json::Value,
        transaction_id: Option<&str>,
        basket: &Basket,
    ) -> PaymentResult<ProcessorResponseEntry> {
        self.responses
            .record(Self::NAME, transaction_id, Some(basket.id), response)
            .await
    }

    fn payment_link_request(&self, basket: &Basket, amount: Money) -> CreatePaymentLinkRequest {
        // reference_id must be unique per link, and a basket may be
        // checked out more than once
        let suffix = Uuid::new_v4().simple().to_string();
        let reference_id = format!("{}-{}", basket.order_number, &suffix[..8]);

        let expire_by = self
            .config()
            .payment_link_expiry_minutes
            .map(|minutes| (Utc::now() + Duration::minutes(minutes)).timestamp());

        let notes = HashMap::from([
            ("basket_id".to_string(), basket.id.to_string()),
            ("order_number".to_string(), basket.order_number.clone()),
            ("site_id".to_string(), basket.site_id.clone()),
        ]);

        CreatePaymentLinkRequest {
            amount: amount.amount,
            currency: amount.currency.as_str().to_string(),
            accept_partial: false,
            reference_id: Some(reference_id),
            description: Some(format!("{} order {}", self.site.name, basket.order_number)),
            expire_by,
            callback_url: self.callback_url(),
            callback_method: "get".to_string(),
            notes,
        }
    }

    fn payment_page_url(&self, short_url: &str, basket: &Basket) -> PaymentResult<String> {
        let redirect = self.site.ecommerce_url(&self.redirect_path());
        let basket_id = basket.id.to_string();
        let url = Url::parse_with_params(
            &redirect,
            &[
                ("redirect_url", short_url),
                ("ecommerce_basket_id", basket_id.as_str()),
            ],
        )
        .map_err(|e| PaymentError::Configuration(format!("Invalid site URL {}: {}", redirect, e)))?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl PaymentProcessor for RazorPay {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn title(&self) -> &'static str {
        Self::TITLE
    }

    #[instrument(skip(self, basket), fields(basket_id = basket.id))]
    async fn get_transaction_parameters(
        &self,
        basket: &Basket,
    ) -> PaymentResult<TransactionParameters> {
        if basket.is_empty() {
            return Err(PaymentError::InvalidRequest(format!(
                "Basket {} has no lines",
                basket.id
            )));
        }

        let total = basket.total_incl_tax()?;
        if !total.is_positive() {
            return Err(PaymentError::InvalidAmount {
                message: format!("Basket {} total is {}", basket.id, total.display()),
            });
        }

        let request = self.payment_link_request(basket, total);
        let link = self.client.create_payment_link(&request).await?;

        self.record_processor_response(link.raw, Some(&link.body.id), basket)
            .await?;
        info!(
            "Successfully created RazorPay payment link [{}] for basket [{}].",
            link.body.id, basket.id
        );

        Ok(TransactionParameters {
            payment_page_url: self.payment_page_url(&link.body.short_url, basket)?,
            transaction_id: link.body.id,
        })
    }

    #[instrument(skip(self, response, basket), fields(basket_id = basket.id))]
    async fn handle_processor_response(
        &self,
        response: &ProcessorResponse,
        basket: &Basket,
    ) -> PaymentResult<HandledProcessorResponse> {
        let payment_id = response.get(PAYMENT_ID_PARAM).map(String::as_str);
        let entry = self
            .record_processor_response(serde_json::to_value(response)?, payment_id, basket)
            .await?;

        let verified = PaymentLinkCallback::from_params(response).and_then(|callback| {
            callback.verify(&self.config().key_secret)?;
            Ok(callback)
        });

        let callback = match verified {
            Ok(callback) => callback,
            Err(e) => {
                error!(
                    "Failed to complete RazorPay payment [{}]. \
                     The payment response was recorded in entry [{}]: {}",
                    payment_id.unwrap_or("unknown"),
                    entry.id,
                    e
                );
                return Err(e);
            }
        };

        info!(
            "Successfully executed RazorPay payment [{}] for basket [{}].",
            callback.payment_id, basket.id
        );

        Ok(HandledProcessorResponse {
            transaction_id: callback.payment_id,
            total: basket.total_incl_tax()?,
            currency: basket.currency,
            card_number: Self::CARD_LABEL.to_string(),
            card_type: None,
        })
    }

    #[instrument(skip(self, basket), fields(basket_id = basket.id, amount = amount.amount))]
    async fn issue_credit(
        &self,
        order_number: &str,
        basket: &Basket,
        reference_number: &str,
        amount: Money,
    ) -> PaymentResult<String> {
        if amount.currency != basket.currency {
            return Err(PaymentError::InvalidRequest(format!(
                "Refund currency {} does not match basket currency {}",
                amount.currency, basket.currency
            )));
        }
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount {
                message: format!("Refund amount must be positive, got {}", amount.amount),
            });
        }
        let total = basket.total_incl_tax()?;
        if amount.amount > total.amount {
            return Err(PaymentError::InvalidAmount {
                message: format!(
                    "Refund of {} exceeds order total {}",
                    amount.display(),
                    total.display()
                ),
            });
        }

        let request = RefundRequest {
            amount: amount.amount,
            speed: "normal".to_string(),
            receipt: Some(order_number.to_string()),
            notes: HashMap::from([
                ("order_number".to_string(), order_number.to_string()),
                ("basket_id".to_string(), basket.id.to_string()),
            ]),
        };

        let refund = self.client.refund_payment(reference_number, &request).await?;
        let entry = self
            .record_processor_response(refund.raw, Some(&refund.body.id), basket)
            .await?;

        if refund.body.is_failed() {
            error!(
                "RazorPay refund [{}] for order [{}] failed. Response recorded in entry [{}].",
                refund.body.id, order_number, entry.id
            );
            return Err(PaymentError::GatewayError(format!(
                "Refund {} failed",
                refund.body.id
            )));
        }

        info!(
            "Refunded {} of RazorPay payment [{}] for order [{}]: refund [{}] is {}.",
            amount.display(),
            reference_number,
            order_number,
            refund.body.id,
            refund.body.status
        );

        Ok(refund.body.id)
    }

    fn error_url(&self) -> String {
        self.site.ecommerce_url(&self.config().error_path)
    }

    fn cancel_url(&self) -> String {
        self.site.ecommerce_url(&self.config().cancel_checkout_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{
        compute_signature, PAYMENT_LINK_ID_PARAM, PAYMENT_LINK_REFERENCE_ID_PARAM,
        PAYMENT_LINK_STATUS_PARAM, SIGNATURE_PARAM,
    };
    use checkout_core::{BasketLine, Currency, InMemoryProcessorResponseStore};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test_secret";

    fn basket() -> Basket {
        let mut basket = Basket::new(1, "edx", "EDX", Currency::INR);
        basket
            .add_line(BasketLine::new(
                "course-v1:edX+DemoX",
                "Demo Course",
                Money::new(499.0, Currency::INR),
                1,
            ))
            .unwrap();
        basket
    }

    fn processor(
        server: &MockServer,
    ) -> (RazorPay, Arc<InMemoryProcessorResponseStore>) {
        let store = Arc::new(InMemoryProcessorResponseStore::new());
        let config = RazorPayConfig::new("rzp_test_key", SECRET).with_api_base_url(server.uri());
        let site = Site::new("edx", "edX", "https://shop.example.com");
        let razorpay = RazorPay::new(config, site, store.clone()).unwrap();
        (razorpay, store)
    }

    fn callback(status: &str, signature: Option<String>) -> ProcessorResponse {
        let message = format!("plink_Ex1|EDX-100001-a1b2|{}|pay_Ex1", status);
        let signature = signature.unwrap_or_else(|| compute_signature(SECRET, &message).unwrap());
        ProcessorResponse::from([
            (PAYMENT_ID_PARAM.to_string(), "pay_Ex1".to_string()),
            (PAYMENT_LINK_ID_PARAM.to_string(), "plink_Ex1".to_string()),
            (
                PAYMENT_LINK_REFERENCE_ID_PARAM.to_string(),
                "EDX-100001-a1b2".to_string(),
            ),
            (PAYMENT_LINK_STATUS_PARAM.to_string(), status.to_string()),
            (SIGNATURE_PARAM.to_string(), signature),
        ])
    }

    #[tokio::test]
    async fn test_get_transaction_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_links"))
            .and(body_partial_json(json!({
                "amount": 49900,
                "currency": "INR",
                "accept_partial": false,
                "callback_url": "https://shop.example.com/payment/razorpay/handlers/callback/",
                "callback_method": "get",
                "notes": {"basket_id": "1", "order_number": "EDX-100001"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "plink_Ex1",
                "short_url": "https://rzp.io/i/abc123",
                "status": "created",
                "amount": 49900,
                "currency": "INR"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (razorpay, store) = processor(&server);
        let params = razorpay.get_transaction_parameters(&basket()).await.unwrap();

        assert_eq!(params.transaction_id, "plink_Ex1");
        assert_eq!(
            params.payment_page_url,
            "https://shop.example.com/payment/razorpay/handlers/redirect/\
             ?redirect_url=https%3A%2F%2Frzp.io%2Fi%2Fabc123&ecommerce_basket_id=1"
        );

        let basket_id = store
            .basket_for_transaction("razorpay", "plink_Ex1")
            .await
            .unwrap();
        assert_eq!(basket_id, 1);
    }

    #[tokio::test]
    async fn test_empty_basket_is_rejected() {
        let server = MockServer::start().await;
        let (razorpay, store) = processor(&server);
        let empty = Basket::new(2, "edx", "EDX", Currency::INR);

        let err = razorpay.get_transaction_parameters(&empty).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_gateway_error_is_not_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_links"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": "BAD_REQUEST_ERROR", "description": "Authentication failed"}
            })))
            .mount(&server)
            .await;

        let (razorpay, store) = processor(&server);
        let err = razorpay.get_transaction_parameters(&basket()).await.unwrap_err();

        assert!(matches!(err, PaymentError::ProviderError { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_handle_paid_callback() {
        let server = MockServer::start().await;
        let (razorpay, store) = processor(&server);

        let handled = razorpay
            .handle_processor_response(&callback("paid", None), &basket())
            .await
            .unwrap();

        assert_eq!(handled.transaction_id, "pay_Ex1");
        assert_eq!(handled.total.amount, 49_900);
        assert_eq!(handled.card_number, "RazorPay");
        assert!(handled.card_type.is_none());

        let entries = store.find_by_transaction("razorpay", "pay_Ex1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].response["razorpay_payment_link_status"], "paid");
    }

    #[tokio::test]
    async fn test_bad_signature_is_recorded_then_rejected() {
        let server = MockServer::start().await;
        let (razorpay, store) = processor(&server);

        let err = razorpay
            .handle_processor_response(&callback("paid", Some("deadbeef".to_string())), &basket())
            .await
            .unwrap_err();

        assert!(err.is_payment_failure());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unpaid_status_is_rejected() {
        let server = MockServer::start().await;
        let (razorpay, _store) = processor(&server);

        let err = razorpay
            .handle_processor_response(&callback("partially_paid", None), &basket())
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::PaymentNotCompleted { .. }));
    }

    #[tokio::test]
    async fn test_issue_credit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/pay_Ex1/refund"))
            .and(body_partial_json(json!({
                "amount": 20000,
                "receipt": "EDX-100001"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "rfnd_Ex1",
                "payment_id": "pay_Ex1",
                "amount": 20000,
                "currency": "INR",
                "status": "processed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (razorpay, store) = processor(&server);
        let refund_id = razorpay
            .issue_credit(
                "EDX-100001",
                &basket(),
                "pay_Ex1",
                Money::new(200.0, Currency::INR),
            )
            .await
            .unwrap();

        assert_eq!(refund_id, "rfnd_Ex1");
        assert_eq!(
            store.find_by_transaction("razorpay", "rfnd_Ex1").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_refund_is_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payments/pay_Ex1/refund"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "rfnd_Ex2",
                "payment_id": "pay_Ex1",
                "amount": 49900,
                "currency": "INR",
                "status": "failed"
            })))
            .mount(&server)
            .await;

        let (razorpay, _store) = processor(&server);
        let err = razorpay
            .issue_credit("EDX-100001", &basket(), "pay_Ex1", Money::new(499.0, Currency::INR))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::GatewayError(_)));
    }

    #[tokio::test]
    async fn test_refund_validation() {
        let server = MockServer::start().await;
        let (razorpay, _store) = processor(&server);

        let wrong_currency = razorpay
            .issue_credit("EDX-100001", &basket(), "pay_Ex1", Money::new(1.0, Currency::USD))
            .await;
        assert!(matches!(wrong_currency, Err(PaymentError::InvalidRequest(_))));

        let too_much = razorpay
            .issue_credit("EDX-100001", &basket(), "pay_Ex1", Money::new(500.0, Currency::INR))
            .await;
        assert!(matches!(too_much, Err(PaymentError::InvalidAmount { .. })));

        let zero = razorpay
            .issue_credit("EDX-100001", &basket(), "pay_Ex1", Money::zero(Currency::INR))
            .await;
        assert!(matches!(zero, Err(PaymentError::InvalidAmount { .. })));
    }

    #[test]
    fn test_hosted_page_redirect() {
        let store = Arc::new(InMemoryProcessorResponseStore::new());
        let config = RazorPayConfig::new("rzp_test_key", SECRET);
        let site = Site::new("edx", "edX", "https://shop.example.com");
        let razorpay = RazorPay::new(config, site, store).unwrap();

        assert_eq!(
            razorpay
                .hosted_page_redirect("https://rzp.io/i/abc123", Some("7"))
                .unwrap(),
            "https://rzp.io/i/abc123?ecommerce_basket_id=7"
        );
        assert_eq!(
            razorpay
                .hosted_page_redirect("https://pages.razorpay.com/pl_x?lang=en", Some("7"))
                .unwrap(),
            "https://pages.razorpay.com/pl_x?lang=en&ecommerce_basket_id=7"
        );
        assert!(razorpay
            .hosted_page_redirect("https://attacker.example/phish", Some("7"))
            .is_err());
        assert!(razorpay
            .hosted_page_redirect("http://rzp.io/i/abc123", None)
            .is_err());
        assert!(razorpay.hosted_page_redirect("not a url", None).is_err());
    }

    #[test]
    fn test_urls() {
        let server_uri = "http://127.0.0.1:9";
        let store = Arc::new(InMemoryProcessorResponseStore::new());
        let config = RazorPayConfig::new("rzp_test_key", SECRET).with_api_base_url(server_uri);
        let site = Site::new("edx", "edX", "https://shop.example.com");
        let razorpay = RazorPay::new(config, site, store).unwrap();

        assert_eq!(razorpay.error_url(), "https://shop.example.com/checkout/error/");
        assert_eq!(
            razorpay.cancel_url(),
            "https://shop.example.com/checkout/cancel-checkout/"
        );
    }
}
