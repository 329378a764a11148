//! Group formation.
//!
//! Membership is claimed on the student (`current_group` must be empty at
//! commit time) before the group admits them, so a student can never end up
//! in two groups. Invites and join requests are re-validated when they are
//! accepted, not only when they were filed.

use chrono::Utc;
use uuid::Uuid;

use super::saga::Saga;
use super::{authorize, Coordinator};
use crate::data::group::db::GroupCreateData;
use crate::data::group::{Group, GroupAction, GroupStatus, Invite, JoinRequest};
use crate::data::store::Filter;
use crate::data::user::UserResponse;
use crate::error::{CoordError, ErrorKind};
use crate::role::{Caller, Operation};

fn ensure_active(group: &Group) -> Result<(), CoordError> {
    if group.status.is_disbanded() {
        return Err(CoordError::state("This group has been disbanded."));
    }
    Ok(())
}

fn ensure_leader(group: &Group, caller: &Caller) -> Result<(), CoordError> {
    if !group.is_leader(caller.user) {
        return Err(CoordError::forbidden(
            "Only the group leader can manage this group.",
        ));
    }
    Ok(())
}

fn group_full(group: &Group) -> CoordError {
    CoordError::conflict(format!(
        "Group {} is full ({} members).",
        group.name, group.member_cap
    ))
}

/// A user may appear in one of members, invites and requests at a time.
fn check_invite_slot(group: &Group, user: Uuid) -> Result<(), CoordError> {
    if group.is_member(user) {
        return Err(CoordError::conflict("Student is already a member of this group."));
    }
    if group.is_invited(user) {
        return Err(CoordError::conflict("Student is already invited to this group."));
    }
    if group.has_requested(user) {
        return Err(CoordError::conflict(
            "Student already asked to join this group, accept the request instead.",
        ));
    }
    if group.is_full() {
        return Err(group_full(group));
    }
    Ok(())
}

fn check_request_slot(group: &Group, user: Uuid) -> Result<(), CoordError> {
    if group.status == GroupStatus::Closed {
        return Err(CoordError::state("This group isn't accepting join requests."));
    }
    if group.is_member(user) {
        return Err(CoordError::conflict("You are already a member of this group."));
    }
    if group.has_requested(user) {
        return Err(CoordError::conflict("You already asked to join this group."));
    }
    if group.is_invited(user) {
        return Err(CoordError::conflict(
            "You are already invited to this group, accept the invitation instead.",
        ));
    }
    if group.is_full() {
        return Err(group_full(group));
    }
    Ok(())
}

impl Coordinator {
    #[tracing::instrument(skip(self))]
    pub async fn create_group(
        &self,
        caller: &Caller,
        data: GroupCreateData,
    ) -> Result<Group, CoordError> {
        authorize(caller, Operation::CreateGroup)?;
        let name = data.validated_name()?;
        let student = self.user(caller.user).await?;

        let current_class = match &student.current_class {
            Some(it) => it.clone(),
            None => return Err(CoordError::state("Enroll in a class before creating a group.")),
        };
        if student.current_group.is_some() {
            return Err(CoordError::conflict("You already belong to a group."));
        }
        let course = self.course(data.course_id).await?;
        if course.class_code != current_class || !course.is_enrolled(student.id) {
            return Err(CoordError::forbidden(
                "You can only create a group in the class you attend.",
            ));
        }

        let group = Group::new(
            name,
            &course.class_code,
            course.id,
            student.id,
            course.group_size.cap() as u32,
        );

        let mut saga = Saga::new("create-group");
        let group = match self.store.groups().insert(group).await {
            Ok(group) => group,
            Err(e) => return Err(saga.fail("insert-group", e.into())),
        };
        saga.commit("insert-group");

        if let Err(e) = self.claim_group(student.id, &group).await {
            let undo = self.discard_group(group.id);
            return Err(saga.rollback("claim-group", e, 1, undo).await);
        }
        saga.commit("claim-group");

        tracing::info!(group = %group.id, class = %group.class_code, "group created");
        Ok(group)
    }

    #[tracing::instrument(skip(self))]
    pub async fn invite(
        &self,
        caller: &Caller,
        group_id: Uuid,
        student_id: &str,
    ) -> Result<Group, CoordError> {
        authorize(caller, Operation::InviteToGroup)?;
        let group = self.group(group_id).await?;
        ensure_active(&group)?;
        ensure_leader(&group, caller)?;

        let student_id = student_id.trim().to_ascii_uppercase();
        let target = self
            .store
            .users()
            .find_one(Filter::new().eq("student_id", &student_id))
            .await?
            .ok_or(CoordError::not_found("Student"))?;
        if !target.role.is_student() {
            return Err(CoordError::validation(
                "student_id",
                "Only students can be invited.",
            ));
        }
        if target.current_class.as_deref() != Some(group.class_code.as_str()) {
            return Err(CoordError::conflict(format!(
                "{} isn't enrolled in class {}.",
                target.student_id, group.class_code
            )));
        }
        check_invite_slot(&group, target.id)?;

        let mut saga = Saga::new("invite");
        let invited = self
            .update_group(group.id, |group| {
                ensure_active(group)?;
                check_invite_slot(group, target.id)?;
                group.pending_invites.push(Invite {
                    user: target.id,
                    invited_at: Utc::now(),
                });
                Ok(())
            })
            .await;
        let group = match invited {
            Ok(group) => group,
            Err(e) => return Err(saga.fail("add-invite", e)),
        };
        saga.commit("add-invite");

        let recorded = self
            .update_user(target.id, |user| {
                if !user.group_invites.contains(&group_id) {
                    user.group_invites.push(group_id);
                }
                Ok(())
            })
            .await;
        if let Err(e) = recorded {
            let undo = self.withdraw_invite(group_id, target.id);
            return Err(saga.rollback("record-invite", e, 1, undo).await);
        }
        saga.commit("record-invite");

        Ok(group)
    }

    #[tracing::instrument(skip(self))]
    pub async fn accept_invite(&self, caller: &Caller, group_id: Uuid) -> Result<Group, CoordError> {
        authorize(caller, Operation::AcceptInvite)?;
        let group = self.group(group_id).await?;
        let user = self.user(caller.user).await?;

        if !group.is_invited(user.id) {
            return Err(CoordError::not_found("Invitation"));
        }
        ensure_active(&group)?;
        match user.current_group {
            Some(current) if current == group.id => {
                return Err(CoordError::conflict("You are already a member of this group."))
            }
            Some(_) => return Err(CoordError::conflict("You already belong to another group.")),
            None => {}
        }
        if user.current_class.as_deref() != Some(group.class_code.as_str()) {
            return Err(CoordError::conflict(
                "You are no longer enrolled in this group's class.",
            ));
        }
        if group.is_full() {
            return Err(group_full(&group));
        }

        let mut saga = Saga::new("accept-invite");
        if let Err(e) = self.claim_group(user.id, &group).await {
            return Err(saga.fail("claim-group", e));
        }
        saga.commit("claim-group");

        let admitted = self
            .update_group(group.id, |group| {
                ensure_active(group)?;
                if !group.remove_invite(user.id) {
                    return Err(CoordError::not_found("Invitation"));
                }
                if group.is_member(user.id) {
                    return Err(CoordError::conflict("You are already a member of this group."));
                }
                if group.is_full() {
                    return Err(group_full(group));
                }
                group.add_member(user.id);
                Ok(())
            })
            .await;

        match admitted {
            Ok(group) => {
                saga.commit("admit-member");
                tracing::info!(group = %group.id, user = %user.id, "invitation accepted");
                Ok(group)
            }
            Err(e) => {
                let undo = self.release_group_claim(user.id, group.id, true);
                Err(saga.rollback("admit-member", e, 1, undo).await)
            }
        }
    }

    /// Drops the invitation from both sides, whether or not it still exists.
    #[tracing::instrument(skip(self))]
    pub async fn reject_invite(
        &self,
        caller: &Caller,
        group_id: Uuid,
    ) -> Result<UserResponse, CoordError> {
        authorize(caller, Operation::RejectInvite)?;

        let mut saga = Saga::new("reject-invite");
        let dropped = self
            .update_user(caller.user, |user| {
                user.group_invites.retain(|it| *it != group_id);
                Ok(())
            })
            .await;
        let user = match dropped {
            Ok(user) => user,
            Err(e) => return Err(saga.fail("drop-invite", e)),
        };
        saga.commit("drop-invite");

        match self.withdraw_invite(group_id, caller.user).await {
            Ok(()) | Err(CoordError::NotFound { .. }) => {}
            Err(e) => return Err(saga.fail("withdraw-invite", e)),
        }
        saga.commit("withdraw-invite");

        Ok(user.into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn request_join(&self, caller: &Caller, group_id: Uuid) -> Result<Group, CoordError> {
        authorize(caller, Operation::RequestJoin)?;
        let group = self.group(group_id).await?;
        let user = self.user(caller.user).await?;
        ensure_active(&group)?;

        if user.current_class.as_deref() != Some(group.class_code.as_str()) {
            return Err(CoordError::conflict("You aren't enrolled in this group's class."));
        }
        if user.current_group.is_some() {
            return Err(CoordError::conflict("You already belong to a group."));
        }
        check_request_slot(&group, user.id)?;

        self.update_group(group.id, |group| {
            ensure_active(group)?;
            check_request_slot(group, user.id)?;
            group.pending_requests.push(JoinRequest {
                user: user.id,
                requested_at: Utc::now(),
            });
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn accept_request(
        &self,
        caller: &Caller,
        group_id: Uuid,
        target: Uuid,
    ) -> Result<Group, CoordError> {
        authorize(caller, Operation::AcceptRequest)?;
        let group = self.group(group_id).await?;
        ensure_active(&group)?;
        ensure_leader(&group, caller)?;
        if !group.has_requested(target) {
            return Err(CoordError::not_found("Join request"));
        }

        let user = self.user(target).await?;
        let stale = if user.current_group.is_some() {
            Some("Student already belongs to a group, the request was removed.")
        } else if user.current_class.as_deref() != Some(group.class_code.as_str()) {
            Some("Student is no longer enrolled in this group's class, the request was removed.")
        } else {
            None
        };
        if let Some(reason) = stale {
            self.drop_request(group.id, target).await?;
            return Err(CoordError::conflict(reason));
        }
        if group.is_full() {
            return Err(group_full(&group));
        }

        let mut saga = Saga::new("accept-request");
        if let Err(e) = self.claim_group(target, &group).await {
            if e.kind() == ErrorKind::Conflict {
                if let Err(drop) = self.drop_request(group.id, target).await {
                    tracing::warn!(group = %group.id, %target, error = %drop, "stale request kept");
                }
            }
            return Err(saga.fail("claim-group", e));
        }
        saga.commit("claim-group");

        let admitted = self
            .update_group(group.id, |group| {
                ensure_active(group)?;
                if !group.remove_request(target) {
                    return Err(CoordError::not_found("Join request"));
                }
                if group.is_member(target) {
                    return Err(CoordError::conflict("Student is already a member of this group."));
                }
                if group.is_full() {
                    return Err(group_full(group));
                }
                group.add_member(target);
                Ok(())
            })
            .await;

        match admitted {
            Ok(group) => {
                saga.commit("admit-member");
                tracing::info!(group = %group.id, user = %target, "join request accepted");
                Ok(group)
            }
            Err(e) => {
                let undo = self.release_group_claim(target, group.id, false);
                Err(saga.rollback("admit-member", e, 1, undo).await)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn reject_request(
        &self,
        caller: &Caller,
        group_id: Uuid,
        target: Uuid,
    ) -> Result<Group, CoordError> {
        authorize(caller, Operation::RejectRequest)?;
        let group = self.group(group_id).await?;
        ensure_leader(&group, caller)?;

        self.update_group(group_id, |group| {
            group.remove_request(target);
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_request(&self, caller: &Caller, group_id: Uuid) -> Result<Group, CoordError> {
        authorize(caller, Operation::CancelRequest)?;
        self.update_group(group_id, |group| {
            group.remove_request(caller.user);
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn leave_group(&self, caller: &Caller, group_id: Uuid) -> Result<Group, CoordError> {
        authorize(caller, Operation::LeaveGroup)?;
        let group = self.group(group_id).await?;
        if !group.is_member(caller.user) {
            return Err(CoordError::state("You aren't a member of this group."));
        }

        let mut saga = Saga::new("leave-group");
        self.detach_member(&mut saga, group.id, caller.user).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn close_group(&self, caller: &Caller, group_id: Uuid) -> Result<Group, CoordError> {
        self.move_group(caller, group_id, GroupAction::Close).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reopen_group(&self, caller: &Caller, group_id: Uuid) -> Result<Group, CoordError> {
        self.move_group(caller, group_id, GroupAction::Reopen).await
    }

    async fn move_group(
        &self,
        caller: &Caller,
        group_id: Uuid,
        action: GroupAction,
    ) -> Result<Group, CoordError> {
        authorize(caller, Operation::CloseGroup)?;
        let group = self.group(group_id).await?;
        ensure_active(&group)?;
        ensure_leader(&group, caller)?;

        self.update_group(group_id, |group| {
            group.status = group
                .status
                .apply(action)
                .map_err(|e| CoordError::state(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn get_group(&self, id: Uuid) -> Result<Group, CoordError> {
        self.group(id).await
    }

    pub async fn list_class_groups(&self, course_id: Uuid) -> Result<Vec<Group>, CoordError> {
        let course = self.course(course_id).await?;
        let mut groups = self
            .store
            .groups()
            .find(Filter::new().eq("class_code", &course.class_code))
            .await?;
        groups.sort_by_key(|it| it.created);
        Ok(groups)
    }

    /// Groups the caller has a pending invitation from.
    pub async fn my_invites(&self, caller: &Caller) -> Result<Vec<Group>, CoordError> {
        let user = self.user(caller.user).await?;
        let mut groups = Vec::with_capacity(user.group_invites.len());
        for id in user.group_invites {
            match self.store.groups().get(id).await? {
                Some(group) if group.is_invited(user.id) => groups.push(group),
                _ => {}
            }
        }
        Ok(groups)
    }

    /// Sets `current_group` if it is still empty and the student still attends
    /// the group's class.
    async fn claim_group(&self, user: Uuid, group: &Group) -> Result<(), CoordError> {
        let group_id = group.id;
        let class_code = group.class_code.as_str();
        self.update_user(user, |user| {
            match user.current_group {
                Some(current) if current == group_id => {
                    return Err(CoordError::conflict("Student is already a member of this group."))
                }
                Some(_) => {
                    return Err(CoordError::conflict("Student already belongs to another group."))
                }
                None => {}
            }
            if user.current_class.as_deref() != Some(class_code) {
                return Err(CoordError::conflict(
                    "Student is no longer enrolled in this group's class.",
                ));
            }
            user.current_group = Some(group_id);
            user.group_invites.retain(|it| *it != group_id);
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn release_group_claim(
        &self,
        user: Uuid,
        group_id: Uuid,
        restore_invite: bool,
    ) -> Result<(), CoordError> {
        self.update_user(user, |user| {
            if user.current_group == Some(group_id) {
                user.current_group = None;
            }
            if restore_invite && !user.group_invites.contains(&group_id) {
                user.group_invites.push(group_id);
            }
            Ok(())
        })
        .await?;
        Ok(())
    }

    pub(super) async fn release_group(&self, user: Uuid, group_id: Uuid) -> Result<(), CoordError> {
        self.release_group_claim(user, group_id, false).await
    }

    async fn discard_group(&self, group_id: Uuid) -> Result<(), CoordError> {
        self.store.groups().delete(group_id).await?;
        Ok(())
    }

    async fn withdraw_invite(&self, group_id: Uuid, user: Uuid) -> Result<(), CoordError> {
        self.update_group(group_id, |group| {
            group.remove_invite(user);
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn drop_request(&self, group_id: Uuid, user: Uuid) -> Result<(), CoordError> {
        self.update_group(group_id, |group| {
            group.remove_request(user);
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Removes `user` from the group, then clears their group pointer. A
    /// departing leader is replaced by the most senior member only with
    /// `leader_succession`; a group left without members is disbanded.
    pub(super) async fn detach_member(
        &self,
        saga: &mut Saga,
        group_id: Uuid,
        user: Uuid,
    ) -> Result<Group, CoordError> {
        let succession = self.policy.leader_succession;
        let left = self
            .update_group(group_id, |group| {
                if !group.remove_member(user) {
                    return Ok(());
                }
                if group.is_leader(user) {
                    group.leader = if succession {
                        group.senior_member()
                    } else {
                        None
                    };
                }
                if group.members.is_empty() {
                    if let Ok(next) = group.status.apply(GroupAction::Disband) {
                        group.status = next;
                    }
                }
                Ok(())
            })
            .await;
        let group = match left {
            Ok(group) => group,
            Err(e) => return Err(saga.fail("leave-group", e)),
        };
        saga.commit("leave-group");

        if let Err(e) = self.release_group(user, group_id).await {
            return Err(saga.fail("release-group", e));
        }
        saga.commit("release-group");

        tracing::info!(
            group = %group.id,
            %user,
            status = ?group.status,
            leader = ?group.leader,
            "member left group"
        );
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::Fixture;
    use super::*;
    use crate::config::Config;
    use crate::data::course::Course;

    async fn team(fx: &Fixture, course: &Course) -> (Caller, Group) {
        let leader = fx.enrolled_student(course).await;
        let group = fx
            .coord
            .create_group(
                &leader,
                GroupCreateData {
                    name: "Team".to_string(),
                    course_id: course.id,
                },
            )
            .await
            .unwrap();
        (leader, group)
    }

    async fn student_id(fx: &Fixture, caller: &Caller) -> String {
        fx.reload_user(caller).await.student_id
    }

    async fn join(fx: &Fixture, leader: &Caller, group: &Group, student: &Caller) -> Group {
        let id = student_id(fx, student).await;
        fx.coord.invite(leader, group.id, &id).await.unwrap();
        fx.coord.accept_invite(student, group.id).await.unwrap()
    }

    #[rocket::async_test]
    async fn creator_leads_and_is_claimed() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let (leader, group) = team(&fx, &course).await;

        assert!(group.is_leader(leader.user));
        assert_eq!(group.member_cap, 5);
        assert_eq!(group.class_code, course.class_code);
        assert_eq!(fx.reload_user(&leader).await.current_group, Some(group.id));

        let again = fx
            .coord
            .create_group(
                &leader,
                GroupCreateData {
                    name: "Second".to_string(),
                    course_id: course.id,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(again.kind(), ErrorKind::Conflict);
        assert_eq!(fx.coord.list_class_groups(course.id).await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn create_requires_the_attended_class() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let other = fx.class(&l, 10).await;
        let data = |course: &Course| GroupCreateData {
            name: "Team".to_string(),
            course_id: course.id,
        };

        let drifter = fx.student().await;
        let err = fx.coord.create_group(&drifter, data(&course)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        let student = fx.enrolled_student(&course).await;
        let err = fx.coord.create_group(&student, data(&other)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(fx.reload_user(&student).await.current_group, None);
    }

    #[rocket::async_test]
    async fn invite_rules() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let other = fx.class(&l, 10).await;
        let (leader, group) = team(&fx, &course).await;
        let mate = fx.enrolled_student(&course).await;
        let outsider = fx.enrolled_student(&other).await;
        let mate_id = student_id(&fx, &mate).await;

        let group_after = fx.coord.invite(&leader, group.id, &mate_id.to_lowercase()).await.unwrap();
        assert!(group_after.is_invited(mate.user));
        assert_eq!(fx.reload_user(&mate).await.group_invites, vec![group.id]);

        let twice = fx.coord.invite(&leader, group.id, &mate_id).await.unwrap_err();
        assert_eq!(twice.kind(), ErrorKind::Conflict);

        let outsider_id = student_id(&fx, &outsider).await;
        let wrong_class = fx.coord.invite(&leader, group.id, &outsider_id).await.unwrap_err();
        assert_eq!(wrong_class.kind(), ErrorKind::Conflict);

        let not_leader = fx.coord.invite(&mate, group.id, &outsider_id).await.unwrap_err();
        assert_eq!(not_leader.kind(), ErrorKind::Authorization);

        let nobody = fx.coord.invite(&leader, group.id, "XX0000").await.unwrap_err();
        assert_eq!(nobody.kind(), ErrorKind::NotFound);

        let invites = fx.coord.my_invites(&mate).await.unwrap();
        assert_eq!(invites.len(), 1);

        let joined = fx.coord.accept_invite(&mate, group.id).await.unwrap();
        assert!(joined.is_member(mate.user));
        assert!(!joined.is_invited(mate.user));
        let user = fx.reload_user(&mate).await;
        assert_eq!(user.current_group, Some(group.id));
        assert!(user.group_invites.is_empty());

        let member = fx.coord.invite(&leader, group.id, &mate_id).await.unwrap_err();
        assert_eq!(member.kind(), ErrorKind::Conflict);
    }

    #[rocket::async_test]
    async fn accept_revalidates_membership_and_class() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let elsewhere = fx.class(&l, 10).await;
        let (leader_a, group_a) = team(&fx, &course).await;
        let (leader_b, group_b) = team(&fx, &course).await;

        let student = fx.enrolled_student(&course).await;
        let id = student_id(&fx, &student).await;
        fx.coord.invite(&leader_a, group_a.id, &id).await.unwrap();
        fx.coord.invite(&leader_b, group_b.id, &id).await.unwrap();

        fx.coord.accept_invite(&student, group_a.id).await.unwrap();
        let err = fx.coord.accept_invite(&student, group_b.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!fx.reload_group(&group_b).await.is_member(student.user));

        let drifter = fx.enrolled_student(&course).await;
        let id = student_id(&fx, &drifter).await;
        fx.coord.invite(&leader_b, group_b.id, &id).await.unwrap();
        fx.coord.switch_class(&drifter, elsewhere.id).await.unwrap();
        let err = fx.coord.accept_invite(&drifter, group_b.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(fx.reload_user(&drifter).await.current_group, None);

        let stranger = fx.enrolled_student(&course).await;
        let err = fx.coord.accept_invite(&stranger, group_b.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[rocket::async_test]
    async fn group_never_exceeds_five() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 20).await;
        let (leader, group) = team(&fx, &course).await;
        for _ in 0..3 {
            let student = fx.enrolled_student(&course).await;
            join(&fx, &leader, &group, &student).await;
        }

        let fifth = fx.enrolled_student(&course).await;
        let sixth = fx.enrolled_student(&course).await;
        let fifth_id = student_id(&fx, &fifth).await;
        let sixth_id = student_id(&fx, &sixth).await;
        fx.coord.invite(&leader, group.id, &fifth_id).await.unwrap();
        fx.coord.invite(&leader, group.id, &sixth_id).await.unwrap();

        let full = fx.coord.accept_invite(&fifth, group.id).await.unwrap();
        assert_eq!(full.members.len(), 5);
        assert_eq!(full.status, GroupStatus::Full);

        let err = fx.coord.accept_invite(&sixth, group.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(fx.reload_user(&sixth).await.current_group, None);

        let seventh = fx.enrolled_student(&course).await;
        let seventh_id = student_id(&fx, &seventh).await;
        let err = fx.coord.invite(&leader, group.id, &seventh_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = fx.coord.request_join(&seventh, group.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(fx.reload_group(&group).await.members.len(), 5);
    }

    #[rocket::async_test]
    async fn join_requests() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let (leader, group) = team(&fx, &course).await;
        let asker = fx.enrolled_student(&course).await;

        let pending = fx.coord.request_join(&asker, group.id).await.unwrap();
        assert!(pending.has_requested(asker.user));
        let twice = fx.coord.request_join(&asker, group.id).await.unwrap_err();
        assert_eq!(twice.kind(), ErrorKind::Conflict);

        let asker_id = student_id(&fx, &asker).await;
        let crossed = fx.coord.invite(&leader, group.id, &asker_id).await.unwrap_err();
        assert_eq!(crossed.kind(), ErrorKind::Conflict);

        let cancelled = fx.coord.cancel_request(&asker, group.id).await.unwrap();
        assert!(!cancelled.has_requested(asker.user));

        fx.coord.request_join(&asker, group.id).await.unwrap();
        let rejected = fx
            .coord
            .reject_request(&leader, group.id, asker.user)
            .await
            .unwrap();
        assert!(!rejected.has_requested(asker.user));

        fx.coord.request_join(&asker, group.id).await.unwrap();
        let err = fx
            .coord
            .accept_request(&asker, group.id, asker.user)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let accepted = fx
            .coord
            .accept_request(&leader, group.id, asker.user)
            .await
            .unwrap();
        assert!(accepted.is_member(asker.user));
        assert!(accepted.pending_requests.is_empty());
        assert_eq!(fx.reload_user(&asker).await.current_group, Some(group.id));
    }

    #[rocket::async_test]
    async fn invited_students_are_told_to_accept() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let (leader, group) = team(&fx, &course).await;
        let student = fx.enrolled_student(&course).await;
        let id = student_id(&fx, &student).await;
        fx.coord.invite(&leader, group.id, &id).await.unwrap();

        let err = fx.coord.request_join(&student, group.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("accept the invitation"));

        let user = fx.coord.reject_invite(&student, group.id).await.unwrap();
        assert!(user.group_invites.is_empty());
        assert!(!fx.reload_group(&group).await.is_invited(student.user));
    }

    #[rocket::async_test]
    async fn stale_request_is_dropped_on_accept() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let (leader_a, group_a) = team(&fx, &course).await;
        let (leader_b, group_b) = team(&fx, &course).await;
        let asker = fx.enrolled_student(&course).await;

        fx.coord.request_join(&asker, group_a.id).await.unwrap();
        join(&fx, &leader_b, &group_b, &asker).await;

        let err = fx
            .coord
            .accept_request(&leader_a, group_a.id, asker.user)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let group_a = fx.reload_group(&group_a).await;
        assert!(!group_a.has_requested(asker.user));
        assert!(!group_a.is_member(asker.user));
        assert_eq!(fx.reload_user(&asker).await.current_group, Some(group_b.id));
    }

    #[rocket::async_test]
    async fn leader_leaving_keeps_a_leaderless_group() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let (leader, group) = team(&fx, &course).await;
        let mate = fx.enrolled_student(&course).await;
        join(&fx, &leader, &group, &mate).await;

        let left = fx.coord.leave_group(&leader, group.id).await.unwrap();
        assert_eq!(left.leader, None);
        assert_eq!(left.status, GroupStatus::Open);
        assert_eq!(fx.reload_user(&leader).await.current_group, None);

        let err = fx.coord.leave_group(&leader, group.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        let last = fx.coord.leave_group(&mate, group.id).await.unwrap();
        assert!(last.members.is_empty());
        assert_eq!(last.status, GroupStatus::Disbanded);

        let newcomer = fx.enrolled_student(&course).await;
        let err = fx.coord.request_join(&newcomer, group.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[rocket::async_test]
    async fn sole_leader_leaving_disbands() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let (leader, group) = team(&fx, &course).await;

        let left = fx.coord.leave_group(&leader, group.id).await.unwrap();
        assert_eq!(left.status, GroupStatus::Disbanded);

        // Free to found a new group afterwards.
        let again = fx
            .coord
            .create_group(
                &leader,
                GroupCreateData {
                    name: "Again".to_string(),
                    course_id: course.id,
                },
            )
            .await
            .unwrap();
        assert_ne!(again.id, group.id);
    }

    #[rocket::async_test]
    async fn succession_promotes_the_senior_member() {
        let mut config = Config::default();
        config.enrollment.leader_succession = true;
        let fx = Fixture::with_config(config).await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let (leader, group) = team(&fx, &course).await;
        let first = fx.enrolled_student(&course).await;
        let second = fx.enrolled_student(&course).await;
        join(&fx, &leader, &group, &first).await;
        join(&fx, &leader, &group, &second).await;

        let left = fx.coord.leave_group(&leader, group.id).await.unwrap();
        assert_eq!(left.leader, Some(first.user));
    }

    #[rocket::async_test]
    async fn closed_groups_refuse_requests() {
        let fx = Fixture::new().await;
        let l = fx.lecturer().await;
        let course = fx.class(&l, 10).await;
        let (leader, group) = team(&fx, &course).await;
        let asker = fx.enrolled_student(&course).await;

        let closed = fx.coord.close_group(&leader, group.id).await.unwrap();
        assert_eq!(closed.status, GroupStatus::Closed);
        let err = fx.coord.request_join(&asker, group.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        let err = fx.coord.close_group(&leader, group.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        // Invitations still work while closed.
        join(&fx, &leader, &group, &asker).await;

        let reopened = fx.coord.reopen_group(&leader, group.id).await.unwrap();
        assert_eq!(reopened.status, GroupStatus::Open);
        assert_eq!(reopened.members.len(), 2);
    }
}
