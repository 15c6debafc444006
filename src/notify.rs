use ethers::types::H256;
use log::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastStatus {
    Pending,
    Success,
    Fail,
    Error,
}

/// Payload handed to the notification collaborator at every lifecycle stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub status: ToastStatus,
    pub message: String,
    pub tx_hash: Option<H256>,
    pub link: Option<String>,
}

impl Toast {
    pub fn pending(message: String, tx_hash: H256) -> Self {
        Toast {
            status: ToastStatus::Pending,
            message,
            tx_hash: Some(tx_hash),
            link: None,
        }
    }

    /// Receipt toast: success or fail depending on the on-chain status flag.
    /// The link points at the transaction hash.
    pub fn receipt(success: bool, message: String, tx_hash: H256) -> Self {
        Toast {
            status: if success {
                ToastStatus::Success
            } else {
                ToastStatus::Fail
            },
            message,
            tx_hash: Some(tx_hash),
            link: Some(format!("{:?}", tx_hash)),
        }
    }

    pub fn error(message: String) -> Self {
        Toast {
            status: ToastStatus::Error,
            message,
            tx_hash: None,
            link: None,
        }
    }
}

/// Fire-and-forget notification sink. The core never reads a reply.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Renders toasts into the process log, standing in for a toast UI.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        let mut detail = toast
            .tx_hash
            .map(|hash| format!(" tx={:?}", hash))
            .unwrap_or_default();
        if let Some(link) = &toast.link {
            detail.push_str(&format!(" link={}", link));
        }
        match toast.status {
            ToastStatus::Pending => info!("(pending) {}{}", toast.message, detail),
            ToastStatus::Success => info!("(success) {}{}", toast.message, detail),
            ToastStatus::Fail => error!("(fail) {}{}", toast.message, detail),
            ToastStatus::Error => error!("(error) {}{}", toast.message, detail),
        }
    }
}
