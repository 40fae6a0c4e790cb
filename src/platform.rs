use std::sync::Arc;
use crate::{
    auth::{Credential, Identity, IdentityProvider},
    blog::{BlogStore, PostDetails},
    config::Config,
    donation::{ClaimCoordinator, DonationStore},
    error::Result,
    receipt::ReceiptDraft,
    score::{Leaderboard, LeaderboardEntry, ScoreEngine, UserScore},
    storage::{
        BillType, Comment, Database, Donation, EcoCertification, NewDonation, NewPost, Post,
        PurchaseMode, SubmissionRecord,
    },
};

/// Transport-agnostic operation surface. Every mutating call takes an
/// explicit credential; reads are open.
pub struct Platform<A> {
    auth: A,
    donations: DonationStore,
    claims: ClaimCoordinator,
    scores: ScoreEngine,
    leaderboard: Leaderboard,
    blog: BlogStore,
}

impl Platform<Arc<Database>> {
    /// Wires every component over one database, which also serves as the
    /// identity provider.
    pub fn open(db: Arc<Database>, config: &Config) -> Self {
        Self::with_auth(db.clone(), db, config)
    }
}

impl<A: IdentityProvider> Platform<A> {
    pub fn with_auth(auth: A, db: Arc<Database>, config: &Config) -> Self {
        Self {
            auth,
            donations: DonationStore::new(db.clone()),
            claims: ClaimCoordinator::new(db.clone()),
            scores: ScoreEngine::new(db.clone(), config.scoring.clone()),
            leaderboard: Leaderboard::new(db.clone()),
            blog: BlogStore::new(db),
        }
    }

    pub fn whoami(&self, credential: &Credential) -> Result<Identity> {
        self.auth.authenticate(credential)
    }

    pub fn create_donation(&self, credential: &Credential, new: NewDonation) -> Result<String> {
        let donor = self.auth.authenticate(credential)?;
        self.donations.create(&donor.user_id, new)
    }

    pub fn list_available(&self) -> Result<Vec<Donation>> {
        self.donations.list_available()
    }

    pub fn my_donations(&self, credential: &Credential) -> Result<Vec<Donation>> {
        let donor = self.auth.authenticate(credential)?;
        self.donations.list_by_donor(&donor.user_id)
    }

    pub fn claim(&self, credential: &Credential, donation_id: &str) -> Result<Donation> {
        let receiver = self.auth.authenticate(credential)?;
        self.claims.claim(donation_id, &receiver.user_id)
    }

    pub fn remove_donation(&self, credential: &Credential, donation_id: &str) -> Result<()> {
        let requester = self.auth.authenticate(credential)?;
        self.donations.remove(donation_id, &requester.user_id)
    }

    /// Finalizes a draft on behalf of the authenticated user and scores it.
    pub fn submit_receipt(
        &self,
        credential: &Credential,
        draft: ReceiptDraft,
        bill_type: BillType,
        purchase_mode: PurchaseMode,
        eco_certification: EcoCertification,
    ) -> Result<UserScore> {
        let user = self.auth.authenticate(credential)?;
        let submission = draft.finalize(&user.user_id, bill_type, purchase_mode, eco_certification)?;
        self.scores.submit(&submission)
    }

    pub fn get_score(&self, user_id: &str) -> Result<UserScore> {
        self.scores.get_score(user_id)
    }

    pub fn my_history(&self, credential: &Credential) -> Result<Vec<SubmissionRecord>> {
        let user = self.auth.authenticate(credential)?;
        self.scores.history(&user.user_id)
    }

    pub fn leaderboard(&self, n: usize) -> Result<Vec<LeaderboardEntry>> {
        self.leaderboard.top_n(n)
    }

    pub fn publish_post(&self, credential: &Credential, new: NewPost) -> Result<String> {
        let author = self.auth.authenticate(credential)?;
        self.blog.create(&author.user_id, new)
    }

    pub fn list_posts(&self) -> Result<Vec<Post>> {
        self.blog.list()
    }

    pub fn get_post(&self, post_id: &str) -> Result<PostDetails> {
        self.blog.get(post_id)
    }

    pub fn delete_post(&self, credential: &Credential, post_id: &str) -> Result<()> {
        let requester = self.auth.authenticate(credential)?;
        self.blog.delete(post_id, &requester.user_id)
    }

    pub fn add_comment(&self, credential: &Credential, post_id: &str, text: &str) -> Result<Comment> {
        let author = self.auth.authenticate(credential)?;
        self.blog.add_comment(post_id, &author.user_id, text)
    }

    pub fn delete_comment(&self, credential: &Credential, post_id: &str, comment_id: &str) -> Result<()> {
        let requester = self.auth.authenticate(credential)?;
        self.blog.delete_comment(post_id, comment_id, &requester.user_id)
    }
}

impl<A: IdentityProvider + ?Sized> IdentityProvider for Arc<A> {
    fn authenticate(&self, credential: &Credential) -> Result<Identity> {
        (**self).authenticate(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{register_user, MockIdentityProvider};
    use crate::error::EcoShareError;
    use crate::storage::FoodType;
    use chrono::{Duration, Utc};

    fn fresh_listing() -> NewDonation {
        let today = Utc::now().date_naive();
        NewDonation {
            full_name: "Dana".into(),
            contact_number: "555-0199".into(),
            food_type: Some(FoodType::NonPerishable),
            item_name: "Canned beans".into(),
            weight: None,
            cooking_date: Some(today - Duration::days(1)),
            expiry_date: Some(today + Duration::days(30)),
            storage_instructions: String::new(),
            pickup_address: "4 Elm St".into(),
            image_ref: None,
        }
    }

    #[test]
    fn test_mutations_require_a_valid_credential() {
        let db = Arc::new(Database::in_memory().unwrap());
        let platform = Platform::open(db, &Config::default());

        let forged = Credential::bearer("forged");
        assert!(matches!(platform.create_donation(&forged, fresh_listing()), Err(EcoShareError::Auth(_))));
        assert!(matches!(platform.claim(&forged, "d1"), Err(EcoShareError::Auth(_))));
        assert!(matches!(platform.remove_donation(&forged, "d1"), Err(EcoShareError::Auth(_))));
        assert!(matches!(
            platform.submit_receipt(&forged, ReceiptDraft::default(), BillType::PurchaseBill, PurchaseMode::Online, EcoCertification::None),
            Err(EcoShareError::Auth(_))
        ));
        assert!(matches!(platform.claim(&Credential::bearer(""), "d1"), Err(EcoShareError::Auth(_))));

        assert!(matches!(
            platform.publish_post(&forged, NewPost::default()),
            Err(EcoShareError::Auth(_))
        ));
        assert!(matches!(platform.add_comment(&forged, "p1", "hi"), Err(EcoShareError::Auth(_))));

        assert!(platform.list_available().unwrap().is_empty());
        assert!(platform.leaderboard(5).unwrap().is_empty());
        assert!(platform.list_posts().unwrap().is_empty());
    }

    #[test]
    fn test_blog_authorship_comes_from_the_credential() {
        let db = Arc::new(Database::in_memory().unwrap());
        let (_, author) = register_user(&db, "Dana").unwrap();
        let (reader, reader_token) = register_user(&db, "Riley").unwrap();
        let platform = Platform::open(db, &Config::default());

        let new = NewPost {
            title: "Zero-waste lunches".into(),
            content: "Pack leftovers in jars.".into(),
            image_ref: None,
        };
        let id = platform.publish_post(&Credential::bearer(&author), new).unwrap();
        let comment = platform.add_comment(&Credential::bearer(&reader_token), &id, "Nice").unwrap();
        assert_eq!(comment.author_id, reader.user_id);
        assert_eq!(platform.get_post(&id).unwrap().post.author_name, "Dana");

        assert!(matches!(
            platform.delete_post(&Credential::bearer(&reader_token), &id),
            Err(EcoShareError::Forbidden(_))
        ));
        platform.delete_comment(&Credential::bearer(&reader_token), &id, &comment.id).unwrap();
        platform.delete_post(&Credential::bearer(&author), &id).unwrap();
        assert!(platform.list_posts().unwrap().is_empty());
    }

    #[test]
    fn test_identity_comes_from_the_credential() {
        let db = Arc::new(Database::in_memory().unwrap());
        let (donor, donor_token) = register_user(&db, "Dana").unwrap();
        let (receiver, receiver_token) = register_user(&db, "Riley").unwrap();
        let platform = Platform::open(db, &Config::default());

        let id = platform.create_donation(&Credential::bearer(&donor_token), fresh_listing()).unwrap();
        assert_eq!(platform.list_available().unwrap()[0].donor_id, donor.user_id);

        assert!(matches!(
            platform.claim(&Credential::bearer(&donor_token), &id),
            Err(EcoShareError::SelfClaim(_))
        ));
        let claimed = platform.claim(&Credential::from_header(&format!("Bearer {}", receiver_token)), &id).unwrap();
        assert_eq!(claimed.claimant_id, Some(receiver.user_id));
        assert!(matches!(
            platform.remove_donation(&Credential::bearer(&donor_token), &id),
            Err(EcoShareError::Conflict(_))
        ));
        assert_eq!(platform.my_donations(&Credential::bearer(&donor_token)).unwrap().len(), 1);
    }

    #[test]
    fn test_submit_receipt_uses_authenticated_user() {
        let db = Arc::new(Database::in_memory().unwrap());
        let (user, _) = register_user(&db, "Sam").unwrap();

        let mut auth = MockIdentityProvider::new();
        let identity = user.clone();
        auth.expect_authenticate()
            .times(2)
            .returning(move |_| Ok(identity.clone()));

        let platform = Platform::with_auth(auth, db, &Config::default());
        let credential = Credential::bearer("issued-elsewhere");

        let mut draft = ReceiptDraft::default();
        draft.correct(crate::storage::ReceiptField::Vendor, "Farmers market");
        let score = platform
            .submit_receipt(&credential, draft, BillType::PurchaseBill, PurchaseMode::LocalStore, EcoCertification::UsdaOrganic)
            .unwrap();

        assert_eq!(score.user_id, user.user_id);
        assert_eq!(score.green_score, 17);
        assert_eq!(platform.get_score(&user.user_id).unwrap().green_score, 17);
        assert_eq!(platform.my_history(&credential).unwrap()[0].submission.vendor, "Farmers market");
        assert_eq!(platform.leaderboard(1).unwrap()[0].name, "Sam");
    }
}
