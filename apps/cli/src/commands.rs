use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use client_core::{
    can_user_review, ensure_reviewable,
    roles::{can_manage_event, require_role},
    user_review, validate_event_draft, validate_event_update, validate_review, ApiClient,
    ClientError, EventListView, EventQuery, FileCredentialStore, RatingStats, SessionManager,
    SortKey, StatusFilter,
};
use shared::{
    domain::{EventId, EventStatus, Role, UserId},
    protocol::{
        Event, EventDraft, EventUpdate, LoginRequest, RegisterRequest, Review, ReviewRequest,
        User, UserUpdateRequest,
    },
};
use tracing::{debug, info};

use crate::{
    config::{prepare_api_url, Settings},
    render, AccountArgs, Command, EventFields, EventPatch, EventsCommand, ProfileCommand,
    ReviewsCommand, UsersCommand,
};

const EVENT_LOAD_FAILED: &str = "Failed to load event details";
const EVENT_SAVE_FAILED: &str = "Failed to save event. Please try again.";
const REVIEW_SUBMIT_FAILED: &str = "Failed to submit review. Please try again.";

pub async fn run(command: Command, settings: &Settings) -> Result<()> {
    let api_url = prepare_api_url(&settings.api_url)?;
    let client = ApiClient::new(&api_url).context("Invalid API URL")?;
    let store = FileCredentialStore::new(&settings.session_file);
    debug!(%api_url, session_file = %settings.session_file.display(), "starting");

    let mut app = App {
        session: SessionManager::new(client.clone(), store),
        client,
    };

    // Commands that replace the session do not need the stored one.
    if !matches!(
        command,
        Command::Login { .. } | Command::Register(_) | Command::Logout
    ) {
        app.session.initialize().await;
    }
    app.dispatch(command).await
}

struct App {
    client: ApiClient,
    session: SessionManager<ApiClient, FileCredentialStore>,
}

impl App {
    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email, password } => self.login(email, password).await,
            Command::Register(account) => self.register(account).await,
            Command::Logout => {
                self.session.logout();
                println!("Logged out.");
                Ok(())
            }
            Command::Whoami => self.whoami(),
            Command::Profile(ProfileCommand::Update {
                username,
                email,
                phone,
            }) => {
                self.update_profile(UserUpdateRequest {
                    username,
                    email,
                    phone_number: phone,
                })
                .await
            }
            Command::Events(command) => self.events(command).await,
            Command::Reviews(command) => self.reviews(command).await,
            Command::Users(command) => self.users(command).await,
        }
    }

    fn token(&self) -> Option<String> {
        self.session.bearer_token().map(str::to_owned)
    }

    /// The session user, cloned so later calls can borrow the session.
    fn require(&self, allowed: &[Role]) -> Result<User, ClientError> {
        require_role(self.session.state(), allowed).cloned()
    }

    async fn login(&mut self, email: String, password: String) -> Result<()> {
        let user = self
            .session
            .login(&LoginRequest { email, password })
            .await
            .context("An unknown error occurred during login.")?;
        println!("Logged in as {} ({}).", user.username, role_label(user));
        Ok(())
    }

    async fn register(&mut self, account: AccountArgs) -> Result<()> {
        let user = self
            .session
            .register(&account_request(account, None))
            .await
            .context("An unknown error occurred during registration.")?;
        println!("Registered and logged in as {}.", user.username);
        Ok(())
    }

    fn whoami(&self) -> Result<()> {
        let user = self.require(&[]).context("Failed to load profile")?;
        print!("{}", render::user_card(&user));
        Ok(())
    }

    async fn update_profile(&mut self, update: UserUpdateRequest) -> Result<()> {
        const FAILED: &str = "Failed to update profile. Please try again.";
        let user = self.require(&[]).context(FAILED)?;
        if update == UserUpdateRequest::default() {
            return Err(ClientError::Validation("Nothing to update".into())).context(FAILED);
        }

        let token = self.token();
        let result = self
            .client
            .update_user(token.as_deref(), &user.id, &update)
            .await;
        self.session.observe(result).context(FAILED)?;
        let refreshed = self.session.refresh_user().await.context(FAILED)?;
        print!("{}", render::user_card(refreshed));
        Ok(())
    }

    async fn events(&mut self, command: EventsCommand) -> Result<()> {
        match command {
            EventsCommand::List {
                status,
                sort,
                organizer,
                mine,
            } => self.list_events(status, sort, organizer, mine).await,
            EventsCommand::Show { id } => self.show_event(EventId(id)).await,
            EventsCommand::Create(fields) => self.create_event(fields).await,
            EventsCommand::Update { id, fields } => self.update_event(EventId(id), fields).await,
            EventsCommand::Publish { id } => {
                self.change_status(EventId(id), EventStatus::Published).await
            }
            EventsCommand::Cancel { id } => {
                self.change_status(EventId(id), EventStatus::Cancelled).await
            }
            EventsCommand::SetStatus { id, status } => {
                self.change_status(EventId(id), status).await
            }
            EventsCommand::Delete { id } => self.delete_event(EventId(id)).await,
        }
    }

    async fn list_events(
        &mut self,
        status: StatusFilter,
        sort: SortKey,
        organizer: Option<String>,
        mine: bool,
    ) -> Result<()> {
        const FAILED: &str = "Failed to load events";
        let organizer = if mine {
            Some(self.require(&[Role::Organizer]).context(FAILED)?.username)
        } else {
            organizer
        };

        let token = self.token();
        let result = match &organizer {
            Some(name) => {
                self.client
                    .list_events_by_organizer(token.as_deref(), name)
                    .await
            }
            None => self.client.list_events(token.as_deref()).await,
        };
        let events = self.session.observe(result).context(FAILED)?;
        debug!(count = events.len(), "fetched events");

        let total = events.len();
        let view = EventListView::new(events, EventQuery::new(status, sort));
        print!("{}", render::event_table(view.visible()));
        println!("{} of {total} event(s), {status}, sorted by {sort}", view.visible_len());
        Ok(())
    }

    async fn show_event(&mut self, id: EventId) -> Result<()> {
        let token = self.token();
        let result = self.client.event_detail(token.as_deref(), &id).await;
        let detail = self.session.observe(result).context(EVENT_LOAD_FAILED)?;

        print!("{}", render::event_detail(&detail, &now()));
        if !detail.reviews.is_empty() {
            println!();
            print!("{}", render::review_table(&detail.reviews));
        }
        Ok(())
    }

    async fn create_event(&mut self, fields: EventFields) -> Result<()> {
        self.ensure_can_manage(None).context(EVENT_SAVE_FAILED)?;
        let draft = EventDraft {
            title: fields.title,
            description: fields.description,
            date: fields.date,
            location: fields.location,
            price: fields.price,
            status: fields.status,
        };
        validate_event_draft(&draft, today()).context(EVENT_SAVE_FAILED)?;

        let token = self.token();
        let result = self.client.create_event(token.as_deref(), &draft).await;
        let created = self.session.observe(result).context(EVENT_SAVE_FAILED)?;
        info!(title = %created.title, "event created");
        print!("{}", render::event_table([&created]));
        Ok(())
    }

    async fn update_event(&mut self, id: EventId, patch: EventPatch) -> Result<()> {
        let update = event_update(patch);
        validate_event_update(&update, today()).context(EVENT_SAVE_FAILED)?;
        let event = self.fetch_event(&id).await?;
        self.ensure_can_manage(event.organizer.as_deref())
            .context(EVENT_SAVE_FAILED)?;

        let token = self.token();
        let result = self.client.update_event(token.as_deref(), &id, &update).await;
        let updated = self.session.observe(result).context(EVENT_SAVE_FAILED)?;
        print!("{}", render::event_table([&updated]));
        Ok(())
    }

    async fn change_status(&mut self, id: EventId, status: EventStatus) -> Result<()> {
        const FAILED: &str = "Failed to update event status";
        let event = self.fetch_event(&id).await?;
        self.ensure_can_manage(event.organizer.as_deref())
            .context(FAILED)?;

        let token = self.token();
        let bearer = token.as_deref();
        let result = match status {
            EventStatus::Published => self.client.publish_event(bearer, &id).await,
            EventStatus::Cancelled => self.client.cancel_event(bearer, &id).await,
            EventStatus::Draft => self.client.update_event_status(bearer, &id, status).await,
        };
        let updated = self.session.observe(result).context(FAILED)?;
        println!("{} is now {}.", updated.title, updated.effective_status());
        Ok(())
    }

    async fn delete_event(&mut self, id: EventId) -> Result<()> {
        const FAILED: &str = "Failed to delete event";
        let event = self.fetch_event(&id).await?;
        self.ensure_can_manage(event.organizer.as_deref())
            .context(FAILED)?;

        let token = self.token();
        let result = self.client.delete_event(token.as_deref(), &id).await;
        self.session.observe(result).context(FAILED)?;
        println!("Deleted {}.", event.title);
        Ok(())
    }

    async fn fetch_event(&mut self, id: &EventId) -> Result<Event> {
        let token = self.token();
        let result = self.client.get_event(token.as_deref(), id).await;
        self.session.observe(result).context(EVENT_LOAD_FAILED)
    }

    fn ensure_can_manage(&self, organizer: Option<&str>) -> Result<(), ClientError> {
        let user = self.require(&[Role::Organizer])?;
        if can_manage_event(Some(&user), organizer) {
            Ok(())
        } else {
            Err(ClientError::Forbidden(format!(
                "{} of this event",
                Role::Organizer
            )))
        }
    }

    async fn reviews(&mut self, command: ReviewsCommand) -> Result<()> {
        match command {
            ReviewsCommand::List { event_id } => self.list_reviews(EventId(event_id)).await,
            ReviewsCommand::Add {
                event_id,
                rating,
                comment,
            } => {
                self.add_review(EventId(event_id), ReviewRequest { rating, comment })
                    .await
            }
            ReviewsCommand::Edit {
                event_id,
                rating,
                comment,
            } => {
                self.edit_review(EventId(event_id), ReviewRequest { rating, comment })
                    .await
            }
            ReviewsCommand::Delete { event_id } => self.delete_review(EventId(event_id)).await,
        }
    }

    async fn list_reviews(&mut self, event_id: EventId) -> Result<()> {
        const FAILED: &str = "Failed to load reviews";
        let token = self.token();
        let result = self.client.list_reviews(token.as_deref(), &event_id).await;
        let reviews = self.session.observe(result).context(FAILED)?;

        let stats = RatingStats::from_reviews(&reviews);
        println!(
            "Average {:.1} / 5 from {} review(s)",
            stats.average_rating, stats.total_reviews
        );
        print!("{}", render::rating_distribution(&stats));
        println!();
        print!("{}", render::review_table(&reviews));
        Ok(())
    }

    async fn add_review(&mut self, event_id: EventId, request: ReviewRequest) -> Result<()> {
        let user = self
            .require(&[])
            .map_err(|_| ClientError::Validation("Please login to submit a review".into()))
            .context(REVIEW_SUBMIT_FAILED)?;
        validate_review(&request).context(REVIEW_SUBMIT_FAILED)?;
        let reviews = self.reviewable_event_reviews(&event_id).await?;
        if !can_user_review(&reviews, &user.id) {
            return Err(ClientError::Validation(
                "You have already reviewed this event".into(),
            ))
            .context(REVIEW_SUBMIT_FAILED);
        }

        let token = self.token();
        let result = self
            .client
            .create_review(token.as_deref(), &event_id, &request)
            .await;
        let review = self.session.observe(result).context(REVIEW_SUBMIT_FAILED)?;
        println!("Review {} saved.", review.id);
        Ok(())
    }

    async fn edit_review(&mut self, event_id: EventId, request: ReviewRequest) -> Result<()> {
        let user = self.require(&[]).context(REVIEW_SUBMIT_FAILED)?;
        validate_review(&request).context(REVIEW_SUBMIT_FAILED)?;
        let reviews = self.reviewable_event_reviews(&event_id).await?;
        let existing = user_review(&reviews, &user.id)
            .ok_or_else(|| ClientError::Validation("You have not reviewed this event".into()))
            .context(REVIEW_SUBMIT_FAILED)?;

        let token = self.token();
        let result = self
            .client
            .update_review(token.as_deref(), &event_id, &existing.id, &request)
            .await;
        let review = self.session.observe(result).context(REVIEW_SUBMIT_FAILED)?;
        println!("Review {} updated.", review.id);
        Ok(())
    }

    async fn delete_review(&mut self, event_id: EventId) -> Result<()> {
        const FAILED: &str = "Failed to delete review";
        let user = self.require(&[]).context(FAILED)?;
        let reviews = self.reviewable_event_reviews(&event_id).await?;
        let existing = user_review(&reviews, &user.id)
            .ok_or_else(|| ClientError::Validation("You have not reviewed this event".into()))
            .context(FAILED)?;

        let token = self.token();
        let result = self
            .client
            .delete_review(token.as_deref(), &event_id, &existing.id)
            .await;
        self.session.observe(result).context(FAILED)?;
        println!("Review deleted.");
        Ok(())
    }

    /// Loads the event's reviews after checking the event has finished.
    async fn reviewable_event_reviews(
        &mut self,
        event_id: &EventId,
    ) -> Result<Vec<Review>> {
        let event = self.fetch_event(event_id).await?;
        ensure_reviewable(&event, &now()).context(REVIEW_SUBMIT_FAILED)?;

        let token = self.token();
        let result = self.client.list_reviews(token.as_deref(), event_id).await;
        self.session.observe(result).context("Failed to load reviews")
    }

    async fn users(&mut self, command: UsersCommand) -> Result<()> {
        match command {
            UsersCommand::List => {
                const FAILED: &str = "Failed to fetch users";
                self.require(&[Role::Admin]).context(FAILED)?;
                let token = self.token();
                let result = self.client.list_users(token.as_deref()).await;
                let users = self.session.observe(result).context(FAILED)?;
                print!("{}", render::user_table(&users));
            }
            UsersCommand::Show { id } => {
                const FAILED: &str = "Failed to fetch users";
                self.require(&[Role::Admin]).context(FAILED)?;
                let token = self.token();
                let result = self.client.get_user(token.as_deref(), &UserId(id)).await;
                let user = self.session.observe(result).context(FAILED)?;
                print!("{}", render::user_card(&user));
            }
            UsersCommand::Delete { id } => {
                const FAILED: &str = "Failed to delete user";
                self.require(&[Role::Admin]).context(FAILED)?;
                let id = UserId(id);
                let token = self.token();
                let result = self.client.delete_user(token.as_deref(), &id).await;
                self.session.observe(result).context(FAILED)?;
                println!("Deleted user {id}.");
            }
            UsersCommand::CreateAccount { account, role } => {
                const FAILED: &str = "Failed to create account";
                self.require(&[Role::Admin]).context(FAILED)?;
                if role == Role::User {
                    return Err(ClientError::Validation(
                        "Accounts created here must be ADMIN or ORGANIZER".into(),
                    ))
                    .context(FAILED);
                }
                let token = self.token();
                let result = self
                    .client
                    .create_account(token.as_deref(), &account_request(account, Some(role)))
                    .await;
                let user = self.session.observe(result).context(FAILED)?;
                info!(username = %user.username, role = %role, "account created");
                print!("{}", render::user_card(&user));
            }
        }
        Ok(())
    }
}

fn account_request(account: AccountArgs, role: Option<Role>) -> RegisterRequest {
    RegisterRequest {
        username: account.username,
        email: account.email,
        phone_number: account.phone,
        password: account.password,
        role,
    }
}

fn event_update(patch: EventPatch) -> EventUpdate {
    EventUpdate {
        title: patch.title,
        description: patch.description,
        date: patch.date,
        location: patch.location,
        price: patch.price,
        status: patch.status,
    }
}

fn role_label(user: &User) -> &'static str {
    user.role.map_or("no role", Role::as_str)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn now() -> DateTime<Local> {
    Local::now()
}
