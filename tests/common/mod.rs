//! Restaurant-order workflow fixture shared by the integration suites
//!
//! A waiter seats (or rejects) an arriving customer depending on table
//! availability and on which tasks were already done, the customer places
//! an order, the waiter hands it to the kitchen and the cook starts
//! preparing. Task restrictions let the waiter greet and hand out menus
//! only while the customer is at the door.

#![allow(dead_code)]

use flowgate::{
    Guard, ManualRoleProvider, ManualTaskCompletion, SimpleStatusHolder, TaskCause, TaskWorkflow,
    TaskWorkflowBuilder, WorkflowResult,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub const VERSION_KEY: &str = "MealOrder_V1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    CustomerArrived,
    WaitingForOrder,
    OrderPlacedWithWaiter,
    OrderHandedToKitchen,
    DishBeingPrepared,
    CustomerLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    ProvideTable,
    RejectCustomer,
    MakeAnOrder,
    HandOrderToKitchen,
    BeginPreparation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    GreetCustomer,
    ProvideMenu,
    PlaceOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    Waiter,
    Customer,
    Cook,
}

/// Business rules consulted by the transition guards
#[derive(Clone)]
pub struct RestaurantRules {
    tables_available: Rc<Cell<bool>>,
}

impl RestaurantRules {
    pub fn new() -> Self {
        Self {
            tables_available: Rc::new(Cell::new(true)),
        }
    }

    pub fn set_tables_available(&self, available: bool) {
        self.tables_available.set(available);
    }

    pub fn tables_available_guard(&self) -> Guard {
        let flag = self.tables_available.clone();
        Guard::new(move || flag.get(), "TablesAvailable").expect("guard")
    }

    pub fn no_tables_available_guard(&self) -> Guard {
        let flag = self.tables_available.clone();
        Guard::new(move || !flag.get(), "NoTablesAvailable").expect("guard")
    }
}

// Payload forms carrying their task tag

pub struct GreetCustomerForm;

impl TaskCause<TaskType> for GreetCustomerForm {
    fn task_cause(&self) -> TaskType {
        TaskType::GreetCustomer
    }
}

pub struct ProvideMenuForm;

impl TaskCause<TaskType> for ProvideMenuForm {
    fn task_cause(&self) -> TaskType {
        TaskType::ProvideMenu
    }
}

pub struct PlaceOrderForm;

impl TaskCause<TaskType> for PlaceOrderForm {
    fn task_cause(&self) -> TaskType {
        TaskType::PlaceOrder
    }
}

pub struct RestaurantFixture {
    pub order: Rc<RefCell<SimpleStatusHolder<Status>>>,
    pub actors: Rc<ManualRoleProvider<Actor>>,
    pub completed: Rc<ManualTaskCompletion<TaskType>>,
    pub rules: RestaurantRules,
    pub workflow: TaskWorkflow<Status, Activity, TaskType, Actor>,
}

pub fn restaurant_workflow() -> RestaurantFixture {
    try_restaurant_workflow().expect("restaurant workflow builds")
}

pub fn try_restaurant_workflow() -> WorkflowResult<RestaurantFixture> {
    let order = Rc::new(RefCell::new(SimpleStatusHolder::new(Status::CustomerArrived)));
    let actors = Rc::new(ManualRoleProvider::new());
    let completed = Rc::new(ManualTaskCompletion::new());
    let rules = RestaurantRules::new();

    actors.impersonate([Actor::Waiter]);

    let tables = rules.tables_available_guard();
    let no_tables = rules.no_tables_available_guard();

    let workflow =
        TaskWorkflowBuilder::new(VERSION_KEY, order.clone(), actors.clone(), completed.clone())
            .configure(move |cfg| {
                let waiter = cfg.roles([Actor::Waiter])?;
                let customer = cfg.roles([Actor::Customer])?;
                let cook = cfg.roles([Actor::Cook])?;
                let menu_provided = cfg.completed([TaskType::ProvideMenu])?;
                let greeted = cfg.completed([TaskType::GreetCustomer])?;

                cfg.state(Status::CustomerArrived)
                    .permit_only_if(
                        Activity::RejectCustomer,
                        Status::CustomerLeft,
                        waiter.clone(),
                        [menu_provided, no_tables],
                    )
                    .permit_only_if(
                        Activity::ProvideTable,
                        Status::WaitingForOrder,
                        waiter.clone(),
                        [greeted, tables],
                    );

                cfg.state(Status::WaitingForOrder).permit_for_roles(
                    Activity::MakeAnOrder,
                    Status::OrderPlacedWithWaiter,
                    customer,
                );

                cfg.state(Status::OrderPlacedWithWaiter).permit_for_roles(
                    Activity::HandOrderToKitchen,
                    Status::OrderHandedToKitchen,
                    waiter,
                );

                cfg.state(Status::OrderHandedToKitchen).permit_for_roles(
                    Activity::BeginPreparation,
                    Status::DishBeingPrepared,
                    cook,
                );

                cfg.tasks_for(Actor::Waiter)
                    .allow([TaskType::GreetCustomer, TaskType::ProvideMenu])
                    .when([Status::CustomerArrived]);

                cfg.tasks_for(Actor::Customer)
                    .allow([TaskType::PlaceOrder])
                    .when([Status::WaitingForOrder]);

                Ok(())
            })
            .build()?;

    Ok(RestaurantFixture {
        order,
        actors,
        completed,
        rules,
        workflow,
    })
}
